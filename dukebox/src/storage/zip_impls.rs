use anyhow::{anyhow, Context, Result};
use std::io::{Read, Seek};
use log::info;
use zip::ZipArchive;
use crate::storage::{BasicFileAttributes, JarEntry, JarEntryEnum, OpenedJar};

impl<R: Read + Seek> OpenedJar for ZipArchive<R> {
	fn len(&self) -> usize {
		ZipArchive::len(self)
	}

	fn by_index(&mut self, index: usize) -> Result<JarEntry> {
		let mut file = ZipArchive::by_index(self, index)
			.with_context(|| anyhow!("failed to open zip entry at index {index}"))?;

		let name = file.name().to_owned();
		let attrs = BasicFileAttributes::new(file.last_modified(), file.extra_data_fields());

		let data = if file.is_dir() {
			Vec::new()
		} else {
			let capacity = file.size()
				.try_into()
				.unwrap_or_else(|x| {
					info!("size of zip file {name:?} doesn't fit in usize: {x:?}");
					0
				});
			let mut data = Vec::with_capacity(capacity);
			file.read_to_end(&mut data)
				.with_context(|| anyhow!("failed to read zip entry {name:?}"))?;
			data
		};

		let data = JarEntryEnum::new(&name, file.is_dir(), data);
		Ok(JarEntry { name, attrs, data })
	}

	fn names(&self) -> impl Iterator<Item=(usize, &'_ str)> {
		(0..ZipArchive::len(self)).filter_map(|x| Some((x, self.name_for_index(x)?)))
	}

	fn by_name(&mut self, name: &str) -> Result<Option<JarEntry>> {
		self.index_for_name(name)
			.map(|index| OpenedJar::by_index(self, index))
			.transpose()
			.with_context(|| anyhow!("could not get file {name} from zip"))
	}
}
