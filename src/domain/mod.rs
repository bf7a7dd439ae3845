/// Pure game domain: tiles, entities, arcade physics, gameplay rules.
/// Nothing here knows about terminals, files or time sources.

pub mod entity;
pub mod physics;
pub mod rules;
pub mod tile;
