use zip::{DateTime, ExtraField};
use zip::write::{ExtendedFileOptions, FileOptions};

/// The file times of a jar entry.
///
/// Use the [`Default`] implementation for having [`None`] everywhere.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BasicFileAttributes {
	pub last_modified: Option<DateTime>,
	pub mtime: Option<u32>,
	pub atime: Option<u32>,
	pub ctime: Option<u32>,
}

impl BasicFileAttributes {
	/// Collects the times from the zip header and the extended timestamp extra field, if there's one.
	pub(crate) fn new<'a>(last_modified: Option<DateTime>, extra_data_fields: impl Iterator<Item=&'a ExtraField>) -> BasicFileAttributes {
		let extended_timestamp = extra_data_fields
			.filter_map(|extra_field| match extra_field {
				ExtraField::ExtendedTimestamp(x) => Some(x),
				#[allow(unreachable_patterns)]
				_ => None,
			})
			.next();

		let mtime = extended_timestamp.and_then(|x| x.mod_time());
		let atime = extended_timestamp.and_then(|x| x.ac_time());
		let ctime = extended_timestamp.and_then(|x| x.cr_time());

		BasicFileAttributes { last_modified, mtime, atime, ctime }
	}

	pub(crate) fn to_file_options<'k>(self) -> FileOptions<'k, ExtendedFileOptions> {
		let mut file_options = FileOptions::default();

		if let Some(last_modified) = self.last_modified {
			file_options = file_options.last_modified_time(last_modified);
		}
		// TODO: write the mtime, atime and ctime as an extended timestamp once `zip` can write that extra field

		file_options
	}
}
