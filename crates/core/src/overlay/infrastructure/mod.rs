pub mod font_locator;
pub mod raster_surface;
