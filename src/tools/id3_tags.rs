use std::path::Path;

use id3::{Tag, TagLike, Version};
use tracing::debug;

use super::{TagWriter, TrackTags};
use crate::error::Result;

/// Writes ID3v2.4 tags in-process
pub struct Id3TagWriter;

impl TagWriter for Id3TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        // Keep frames the encoder may already have written
        let mut tag = match Tag::read_from_path(path) {
            Ok(tag) => tag,
            Err(id3::Error {
                kind: id3::ErrorKind::NoTag,
                ..
            }) => Tag::new(),
            Err(e) => return Err(e.into()),
        };

        tag.set_artist(tags.artist.as_str());
        tag.set_album(tags.album.as_str());
        tag.set_album_artist(tags.album_artist.as_str());
        tag.set_title(tags.title.as_str());
        tag.set_track(tags.track_number);

        tag.write_to_path(path, Version::Id3v24)?;
        debug!("Tagged {} as track {}", path.display(), tags.track_number);
        Ok(())
    }
}
