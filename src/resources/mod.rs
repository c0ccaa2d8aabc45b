/**
 * This module contains all logic for loading assets referenced by a scene from external files.
 */
pub mod texture;
