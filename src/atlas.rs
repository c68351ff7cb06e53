/// Atlas descriptor model and image loading.
pub mod descriptor;
/// On-demand sprite slicing, transformation and caching.
pub mod slicer;
