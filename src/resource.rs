//! Resource resolution (`do_request`, §4.5): turns a parsed request-target
//! into either an HTTP error outcome or a memory-mapped file ready to be
//! streamed out by the scatter-gather writer.

use std::ffi::OsStr;
use std::fs::File;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::path::{Component, Path, PathBuf};

/// Maximum length, in bytes, of a resolved absolute path. Mirrors the
/// original's `FILENAME_LEN` stack buffer.
pub const FILENAME_LEN: usize = 200;

/// A read-only `mmap`-backed view of a file's contents.
///
/// `munmap` runs in [`Drop`], so releasing a `FileMap` — whether via
/// explicit drop after the response flushes or implicitly on connection
/// teardown — is the one place the mapping goes away. There is no separate
/// `unmap()` to forget to call: holding `Option<FileMap>` and `take()`-ing
/// it is what the rest of the crate uses for idempotent release.
#[derive(Debug)]
pub struct FileMap {
    addr: *mut libc::c_void,
    len: usize,
}

// SAFETY: the mapping is read-only (`PROT_READ`) and privately owned; no
// other thread can write through it, so sharing the pointer across threads
// is sound.
unsafe impl Send for FileMap {}
unsafe impl Sync for FileMap {}

impl FileMap {
    /// The mapped bytes. Empty for a zero-length file (mapping a
    /// zero-length region is undefined behavior, so none is created).
    pub fn as_slice(&self) -> &[u8] {
        if self.len == 0 {
            &[]
        } else {
            // SAFETY: `addr` was returned by a successful `mmap` of `len`
            // bytes with `PROT_READ`, held alive for the lifetime of self.
            unsafe { std::slice::from_raw_parts(self.addr.cast::<u8>(), self.len) }
        }
    }

    /// Length of the mapped file, in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the mapped file is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for FileMap {
    fn drop(&mut self) {
        if self.len > 0 {
            // SAFETY: `addr`/`len` describe exactly the region `mmap`
            // returned; this runs at most once since `Drop` runs at most
            // once per value.
            unsafe {
                libc::munmap(self.addr, self.len);
            }
        }
    }
}

/// Outcome of resolving a request-target against `doc_root`.
#[derive(Debug)]
pub enum ResourceOutcome {
    /// The target was too long, named a directory, or otherwise malformed.
    BadRequest,
    /// `stat` failed: no such file.
    NoResource,
    /// The file exists but lacks world-read permission.
    Forbidden,
    /// The file was opened and mapped successfully.
    File(FileMap),
}

/// Resolves `target` (the raw bytes of a request-target, always beginning
/// with `/`) against `doc_root`, normalizing `.`/`..` segments and rejecting
/// any resolution that would escape `doc_root` — the path-traversal fix
/// flagged as an open question in the distilled spec and resolved here.
pub fn resolve(doc_root: &Path, target: &[u8]) -> ResourceOutcome {
    let Ok(target) = std::str::from_utf8(target) else {
        return ResourceOutcome::BadRequest;
    };

    let mut normalized = PathBuf::new();
    for component in Path::new(target.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return ResourceOutcome::BadRequest;
                }
            }
            Component::RootDir | Component::Prefix(_) => return ResourceOutcome::BadRequest,
        }
    }

    let mut path = doc_root.to_path_buf();
    path.push(&normalized);

    if path_len(path.as_os_str()) > FILENAME_LEN {
        return ResourceOutcome::BadRequest;
    }

    let metadata = match std::fs::metadata(&path) {
        Ok(metadata) => metadata,
        Err(_) => return ResourceOutcome::NoResource,
    };

    // The `.`/`..` normalization above only rejects lexical escapes; a
    // symlink inside doc_root (a file or an intermediate directory) can
    // still resolve outside it. Canonicalizing both sides and checking
    // containment catches that regardless of where the symlink sits.
    let real_root = match std::fs::canonicalize(doc_root) {
        Ok(real_root) => real_root,
        Err(_) => return ResourceOutcome::NoResource,
    };
    let real_path = match std::fs::canonicalize(&path) {
        Ok(real_path) => real_path,
        Err(_) => return ResourceOutcome::NoResource,
    };
    if !real_path.starts_with(&real_root) {
        return ResourceOutcome::BadRequest;
    }

    if metadata.is_dir() {
        return ResourceOutcome::BadRequest;
    }

    if metadata.permissions().mode() & 0o004 == 0 {
        return ResourceOutcome::Forbidden;
    }

    let file = match File::open(&path) {
        Ok(file) => file,
        Err(_) => return ResourceOutcome::NoResource,
    };

    let len = metadata.len() as usize;
    if len == 0 {
        return ResourceOutcome::File(FileMap {
            addr: std::ptr::null_mut(),
            len: 0,
        });
    }

    // SAFETY: `file` is open for reading and outlives this call; the
    // mapping is private and read-only, so no writer can observe or race
    // with it. The descriptor is dropped immediately after, per §4.5 — the
    // mapping itself keeps the content alive.
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            len,
            libc::PROT_READ,
            libc::MAP_PRIVATE,
            file.as_raw_fd(),
            0,
        )
    };

    if addr == libc::MAP_FAILED {
        return ResourceOutcome::NoResource;
    }

    ResourceOutcome::File(FileMap { addr, len })
}

fn path_len(path: &OsStr) -> usize {
    path.as_bytes().len()
}
