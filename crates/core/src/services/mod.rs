pub mod exiftool;
pub mod tika;

pub use exiftool::ExifToolReader;
pub use tika::TikaExtractor;
