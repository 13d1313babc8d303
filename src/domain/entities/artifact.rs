/// Category of a stored artifact, mapping to a fixed key prefix in the object storage.
///
/// All artifacts derived from one uploaded image share the same job key and only
/// differ by their category prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The uploaded image, as received
    Raw,
    /// Cropped headshot extracted from the raw image
    Headshot,
    /// Headshot with its background removed (image with transparency)
    HeadshotNoBg,
    /// Cropped paper/document region extracted from the raw image
    Paper,
}

impl ArtifactKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Raw => "raw_images",
            ArtifactKind::Headshot => "headshots",
            ArtifactKind::HeadshotNoBg => "headshots_rembg",
            ArtifactKind::Paper => "papers",
        }
    }

    /// Full object path of an artifact of this kind for a given job key
    pub fn object_path(&self, job_key: &str) -> String {
        format!("{}/{}", self.prefix(), job_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_kind_maps_to_its_fixed_prefix() {
        assert_eq!(ArtifactKind::Raw.prefix(), "raw_images");
        assert_eq!(ArtifactKind::Headshot.prefix(), "headshots");
        assert_eq!(ArtifactKind::HeadshotNoBg.prefix(), "headshots_rembg");
        assert_eq!(ArtifactKind::Paper.prefix(), "papers");
    }

    #[test]
    fn object_path_joins_prefix_and_job_key() {
        assert_eq!(
            ArtifactKind::Headshot.object_path("abc123.jpg"),
            "headshots/abc123.jpg"
        );
    }
}
