pub mod packet;
pub mod visual_list;
