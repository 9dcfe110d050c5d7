//! Fixing up `META-INF` after remapping: signatures no longer match the renamed classes.

use anyhow::{anyhow, Context, Result};
use quill::remapper::ClassRemapper;

pub(crate) const MANIFEST: &str = "META-INF/MANIFEST.MF";

/// Maximum length of a manifest line in bytes, without the line break.
const LINE_LENGTH: usize = 72;

/// Returns `true` for the signature files of a signed jar.
pub(crate) fn is_signature_file(path: &str) -> bool {
	let Some(name) = path.strip_prefix("META-INF/") else {
		return false;
	};
	if name.contains('/') {
		return false;
	}
	let upper = name.to_ascii_uppercase();
	[".SF", ".RSA", ".DSA", ".EC"].iter().any(|extension| upper.ends_with(extension))
}

/// Removes the per entry digests from a manifest, and remaps the classes named in the main section.
///
/// Sections left without attributes other than their `Name` are removed.
pub(crate) fn fix_manifest(data: &[u8], remapper: &dyn ClassRemapper) -> Result<Vec<u8>> {
	let text = std::str::from_utf8(data)
		.context("manifest isn't valid utf-8")?;
	let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

	// unfold continuation lines
	let mut lines: Vec<String> = Vec::new();
	for line in text.lines() {
		if let Some(continuation) = line.strip_prefix(' ') {
			if let Some(last) = lines.last_mut().filter(|last| !last.is_empty()) {
				last.push_str(continuation);
				continue;
			}
		}
		lines.push(line.to_owned());
	}

	let mut out = String::with_capacity(text.len());
	for (index, section) in lines.split(|line| line.is_empty()).enumerate() {
		let main = index == 0;

		let mut kept = Vec::new();
		for line in section {
			let Some((key, value)) = line.split_once(": ") else {
				kept.push(line.clone());
				continue;
			};
			if key.ends_with("-Digest") || key.ends_with("-Digest-Manifest") {
				continue;
			}
			if main && (key == "Main-Class" || key == "Launcher-Agent-Class") {
				let class = remapper.map_class(&value.replace('.', "/"))
					.with_context(|| anyhow!("failed to remap {key} {value:?}"))?;
				kept.push(format!("{key}: {}", class.replace('/', ".")));
			} else {
				kept.push(line.clone());
			}
		}

		let only_name = kept.iter().all(|line| line.starts_with("Name:"));
		if !main && only_name {
			continue;
		}

		for line in &kept {
			fold(&mut out, line, newline);
		}
		out.push_str(newline);
	}

	Ok(out.into_bytes())
}

/// Writes the line, split into lines of at most [`LINE_LENGTH`] bytes.
fn fold(out: &mut String, line: &str, newline: &str) {
	let mut rest = line;
	let mut limit = LINE_LENGTH;
	loop {
		if rest.len() <= limit {
			out.push_str(rest);
			out.push_str(newline);
			return;
		}
		let mut split = limit;
		while !rest.is_char_boundary(split) {
			split -= 1;
		}
		out.push_str(&rest[..split]);
		out.push_str(newline);
		out.push(' ');
		rest = &rest[split..];
		// the space counts towards the length
		limit = LINE_LENGTH - 1;
	}
}
