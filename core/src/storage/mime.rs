/// Fallback for files whose extension is unknown.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Guess a MIME type from a file name's extension.
pub fn guess_from_name(name: &str) -> &'static str {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return OCTET_STREAM;
    };
    if stem.is_empty() {
        // Dotfiles such as `.nomedia` have no extension.
        return OCTET_STREAM;
    }

    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "ico" => "image/x-icon",
        "psd" => "application/x-photoshop",
        "cr2" => "image/x-dcraw",
        "nef" => "image/x-dcraw",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "pdf" => "application/pdf",
        "txt" | "md" => "text/plain",
        "json" => "application/json",
        "zip" => "application/zip",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guesses_common_media_types() {
        assert_eq!(guess_from_name("beach.JPG"), "image/jpeg");
        assert_eq!(guess_from_name("clip.mp4"), "video/mp4");
        assert_eq!(guess_from_name("vector.svg"), "image/svg+xml");
    }

    #[test]
    fn unknown_and_extensionless_names_fall_back() {
        assert_eq!(guess_from_name("README"), OCTET_STREAM);
        assert_eq!(guess_from_name(".nomedia"), OCTET_STREAM);
        assert_eq!(guess_from_name("archive.xyz"), OCTET_STREAM);
    }
}
