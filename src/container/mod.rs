// Tagged-block container parsing — locates the embedded key image inside the player asset.

pub mod reader;
pub mod swf;
