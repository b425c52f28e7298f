pub mod geotiff;
pub mod types;
pub mod utils;

use std::path::Path;

pub use geotiff::{GeoTiffReader, write_rgba};
pub use types::{Data, DataReader, FileType, ReadError};
pub use utils::reader_from_filetype;

pub fn create_reader(path: &Path) -> Result<Box<dyn DataReader>, ReadError> {
    match reader_from_filetype(path)? {
        FileType::GeoTiff => Ok(Box::new(GeoTiffReader {
            path: path.to_path_buf(),
        })),
    }
}
