mod file_attrs;
pub use file_attrs::BasicFileAttributes;

mod jar;
pub use jar::Jar;

mod jar_entry;
pub use jar_entry::{JarEntry, JarEntryEnum};

mod opened_jar;
pub use opened_jar::{OpenedJar, super_classes};

mod writer;
pub use writer::{write_entry, write_file, write_vec};

mod zip_file;
pub use zip_file::FileJar;

mod zip_impls;

mod zip_mem_named;
pub use zip_mem_named::NamedMemJar;
