use std::io::{self, Cursor};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::error::{InstallError, InstallResult};

const NATIVE_SUFFIXES: [&str; 4] = [".dll", ".so", ".dylib", ".jnilib"];

/// Unpack the shared libraries at the root of a natives jar into `dest_dir`.
/// Returns how many files were written.
pub async fn extract_natives(jar: &Path, dest_dir: &Path) -> InstallResult<usize> {
    let bytes = tokio::fs::read(jar)
        .await
        .map_err(|e| InstallError::io(jar, e))?;
    tokio::fs::create_dir_all(dest_dir)
        .await
        .map_err(|e| InstallError::io(dest_dir, e))?;

    let jar_path = jar.to_path_buf();
    let dest = dest_dir.to_path_buf();
    tokio::task::spawn_blocking(move || unpack(bytes, &jar_path, &dest))
        .await
        .map_err(|e| InstallError::io(jar, io::Error::other(e)))?
}

fn unpack(bytes: Vec<u8>, jar: &Path, dest_dir: &Path) -> InstallResult<usize> {
    let corrupt = |e: zip::result::ZipError| {
        InstallError::io(jar, io::Error::new(io::ErrorKind::InvalidData, e))
    };
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(corrupt)?;

    let mut written = 0;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(corrupt)?;
        let name = file.name().to_string();
        let nested = name.contains('/') || name.contains('\\');
        if file.is_dir() || nested || name.starts_with("META-INF") {
            continue;
        }
        if !NATIVE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            continue;
        }

        let out_path: PathBuf = dest_dir.join(&name);
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| InstallError::io(&out_path, e))?;
        io::copy(&mut file, &mut out).map_err(|e| InstallError::io(&out_path, e))?;
        debug!("Extracted native {}", name);
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn natives_jar(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            for (name, body) in entries {
                zip.start_file(*name, zip::write::SimpleFileOptions::default())
                    .unwrap();
                zip.write_all(body).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[tokio::test]
    async fn only_root_level_libraries_are_extracted() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lwjgl-platform-natives-linux.jar");
        std::fs::write(
            &jar,
            natives_jar(&[
                ("liblwjgl.so", b"elf"),
                ("lwjgl.dll", b"pe"),
                ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0"),
                ("META-INF/liblwjgl.so", b"signed copy"),
                ("nested/libopenal.so", b"elf"),
                ("readme.txt", b"hi"),
            ]),
        )
        .unwrap();
        let natives = dir.path().join("natives");

        let written = extract_natives(&jar, &natives).await.unwrap();

        assert_eq!(written, 2);
        assert_eq!(std::fs::read(natives.join("liblwjgl.so")).unwrap(), b"elf");
        assert!(natives.join("lwjgl.dll").is_file());
        assert!(!natives.join("readme.txt").exists());
        assert!(!natives.join("libopenal.so").exists());
    }

    #[tokio::test]
    async fn unreadable_jar_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("broken.jar");
        std::fs::write(&jar, b"not a zip").unwrap();

        let err = extract_natives(&jar, &dir.path().join("natives"))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Io { path, .. } if *path == jar));
    }
}
