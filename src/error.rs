use std::path::PathBuf;

use thiserror::Error;

macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::Malformed {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::Malformed {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Most failures that happen while walking a classpath (a broken jar, a class file that does not
/// parse, a class that no archive provides) are recovered locally: they are memoized by the
/// [`crate::store::ClassStore`] or the [`crate::dependencies::DependencyResolver`] and never
/// reach the caller of a search. The variants that do surface through
/// [`crate::Analyzer::find_callers`] are initialization-order mistakes and malformed input.
///
/// # Error Categories
///
/// ## Class File Parsing Errors
/// - [`Error::Malformed`] - Corrupted or invalid class file structure
/// - [`Error::OutOfBounds`] - Attempted to read beyond the end of a class file
///
/// ## Archive Errors
/// - [`Error::FileError`] - Filesystem I/O errors
/// - [`Error::ArchiveError`] - The zip container could not be read
/// - [`Error::XmlError`] - An embedded build descriptor is not well-formed
/// - [`Error::EmptyArchive`] - The archive holds no class entries
/// - [`Error::TooManyFailures`] - Too many class entries of one archive failed to parse
/// - [`Error::NotADirectory`] - Classpath root is not a directory
///
/// ## Search Errors
/// - [`Error::NotInitialized`] - A search ran before any archive was resolved
/// - [`Error::InvalidSignature`] - A call signature string could not be parsed
///
/// # Examples
///
/// ```rust,no_run
/// use jarscope::{Analyzer, Error, SearchConfig};
///
/// let analyzer = Analyzer::new(SearchConfig::default());
/// match analyzer.find_callers("java.io.File#delete#()Z#1", true) {
///     Ok(tree) => println!("{} nodes", tree.len()),
///     Err(Error::NotInitialized) => eprintln!("resolve the classpath first"),
///     Err(e) => eprintln!("search failed: {e}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The class file is damaged and could not be parsed.
    ///
    /// The error includes the source location where the malformation was detected for
    /// debugging purposes.
    ///
    /// # Fields
    ///
    /// * `message` - Detailed description of what was malformed
    /// * `file` - Source file where the error was detected
    /// * `line` - Source line where the error was detected
    #[error("Malformed - {file}:{line}: {message}")]
    Malformed {
        /// The message to be printed for the Malformed error
        message: String,
        /// The source file in which this error occured
        file: &'static str,
        /// The source line in which this error occured
        line: u32,
    },

    /// An out of bound access was attempted while parsing a class file.
    #[error("Out of Bound read would have occurred!")]
    OutOfBounds,

    /// File I/O error.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// The zip container of an archive could not be read.
    #[error("{0}")]
    ArchiveError(#[from] zip::result::ZipError),

    /// An embedded `pom.xml` could not be parsed.
    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    /// The archive does not contain a single class entry.
    #[error("Archive contains no class entries - {}", .0.display())]
    EmptyArchive(PathBuf),

    /// More class entries of an archive failed to parse than the configured threshold allows.
    ///
    /// The whole archive is treated as unreadable afterwards.
    #[error("Too many broken class entries ({failures}) in {}", path.display())]
    TooManyFailures {
        /// The archive being loaded
        path: PathBuf,
        /// Number of entries that failed before the load was aborted
        failures: usize,
    },

    /// The classpath root handed to a directory walk is not a directory.
    #[error("{} must be a directory", .0.display())]
    NotADirectory(PathBuf),

    /// The package index is empty.
    ///
    /// Raised when a search or class lookup runs before
    /// [`crate::Analyzer::resolve_classpath`]. An empty result here would be indistinguishable
    /// from a true negative, so the lookup fails instead.
    #[error("Package index is empty, resolve the classpath before searching")]
    NotInitialized,

    /// A call signature string is not of the form `owner#name#descriptor-or-null#access`.
    #[error("Invalid call signature - {0}")]
    InvalidSignature(String),
}
