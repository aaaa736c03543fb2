pub mod identity;
pub mod payload;
pub mod provider;
pub mod raster;
pub mod resolver;
pub mod update;
