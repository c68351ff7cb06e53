/// Animation descriptor model (symbols, layers, timed frames, elements).
pub mod model;
/// Recursive timeline resolution into flat sprite placements.
pub mod resolver;
