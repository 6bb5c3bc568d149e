//! Linux implementation of the direct kernel transport.
//!
//! Issues raw `bpf(2)` syscalls for descriptor and single-key element
//! operations, and mounts the BPF filesystem when it is missing. The
//! attribute blocks mirror the `union bpf_attr` layouts from
//! `uapi/linux/bpf.h` for the commands used here.

#![allow(unsafe_code)] // Raw syscalls; every unsafe block carries a SAFETY note.

use std::ffi::CString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use super::{KernelError, MapFd, MapKernel};

const BPF_MAP_LOOKUP_ELEM: libc::c_long = 1;
const BPF_MAP_UPDATE_ELEM: libc::c_long = 2;
const BPF_OBJ_GET: libc::c_long = 7;

/// `BPF_ANY`: create a new element or update an existing one.
const BPF_ANY: u64 = 0;

/// Attribute block for `BPF_MAP_LOOKUP_ELEM` / `BPF_MAP_UPDATE_ELEM`.
///
/// The explicit padding keeps `key` at offset 8 as the kernel expects and
/// lets `Default` produce a fully zeroed block.
#[repr(C)]
#[derive(Default)]
struct MapElemAttr {
    map_fd: u32,
    _pad: u32,
    key: u64,
    value: u64,
    flags: u64,
}

/// Attribute block for `BPF_OBJ_GET`.
#[repr(C)]
#[derive(Default)]
struct ObjGetAttr {
    pathname: u64,
    bpf_fd: u32,
    file_flags: u32,
}

fn sys_bpf<T>(call: &'static str, cmd: libc::c_long, attr: &T) -> Result<i64, KernelError> {
    // SAFETY: `attr` is a fully initialized, zero-padded repr(C) attribute
    // block that outlives the call; the kernel reads at most
    // `size_of::<T>()` bytes from it.
    let ret = unsafe {
        libc::syscall(
            libc::SYS_bpf,
            cmd,
            attr as *const T,
            std::mem::size_of::<T>() as libc::c_ulong,
        )
    };
    if ret < 0 {
        Err(KernelError::Syscall {
            call,
            source: io::Error::last_os_error(),
        })
    } else {
        Ok(i64::from(ret))
    }
}

fn path_cstring(path: &Path) -> Result<CString, KernelError> {
    CString::new(path.as_os_str().as_bytes()).map_err(|_| KernelError::InvalidPath(path.to_path_buf()))
}

/// Direct kernel transport backed by real `bpf(2)` syscalls.
#[derive(Debug)]
pub struct SysKernel {
    bpffs_root: PathBuf,
}

impl SysKernel {
    /// Creates a transport that expects the BPF filesystem at `bpffs_root`.
    #[must_use]
    pub fn new(bpffs_root: impl Into<PathBuf>) -> Self {
        Self {
            bpffs_root: bpffs_root.into(),
        }
    }

    fn is_mounted(&self) -> Result<bool, KernelError> {
        let mounts = fs::read_to_string("/proc/mounts").map_err(KernelError::MountTable)?;
        Ok(mount_table_has_bpffs(&mounts, &self.bpffs_root))
    }
}

/// Scans `/proc/mounts` content for a `bpf`-type filesystem at `root`.
fn mount_table_has_bpffs(table: &str, root: &Path) -> bool {
    for line in table.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() >= 3 && fields[2] == "bpf" && Path::new(fields[1]) == root {
            return true;
        }
    }
    false
}

impl MapKernel for SysKernel {
    fn ensure_mounted(&self) -> Result<bool, KernelError> {
        if self.is_mounted()? {
            return Ok(false);
        }

        let target = path_cstring(&self.bpffs_root)?;
        // SAFETY: all pointers reference NUL-terminated strings that outlive
        // the call; the data argument is unused for bpffs.
        let rc = unsafe {
            libc::mount(
                c"bpf".as_ptr(),
                target.as_ptr(),
                c"bpf".as_ptr(),
                0,
                std::ptr::null(),
            )
        };
        if rc != 0 {
            return Err(KernelError::Mount {
                path: self.bpffs_root.clone(),
                source: io::Error::last_os_error(),
            });
        }
        tracing::info!("mounted bpf filesystem at {}", self.bpffs_root.display());
        Ok(true)
    }

    fn open_pin(&self, path: &Path) -> Result<MapFd, KernelError> {
        let c_path = path_cstring(path)?;
        let attr = ObjGetAttr {
            pathname: c_path.as_ptr() as u64,
            ..ObjGetAttr::default()
        };
        match sys_bpf("bpf(BPF_OBJ_GET)", BPF_OBJ_GET, &attr) {
            #[allow(clippy::cast_possible_truncation)]
            Ok(fd) => Ok(MapFd::new(fd as i32)),
            Err(KernelError::Syscall { source, .. }) => Err(KernelError::OpenPin {
                path: path.to_path_buf(),
                source,
            }),
            Err(e) => Err(e),
        }
    }

    fn lookup_elem(&self, fd: MapFd, key: &[u8], value_size: usize) -> Result<Vec<u8>, KernelError> {
        let mut value = vec![0u8; value_size];
        #[allow(clippy::cast_sign_loss)]
        let attr = MapElemAttr {
            map_fd: fd.raw() as u32,
            key: key.as_ptr() as u64,
            value: value.as_mut_ptr() as u64,
            ..MapElemAttr::default()
        };
        match sys_bpf("bpf(BPF_MAP_LOOKUP_ELEM)", BPF_MAP_LOOKUP_ELEM, &attr) {
            Ok(_) => Ok(value),
            Err(KernelError::Syscall { source, .. })
                if source.raw_os_error() == Some(libc::ENOENT) =>
            {
                Err(KernelError::KeyNotFound)
            }
            Err(e) => Err(e),
        }
    }

    fn update_elem(&self, fd: MapFd, key: &[u8], value: &[u8]) -> Result<(), KernelError> {
        #[allow(clippy::cast_sign_loss)]
        let attr = MapElemAttr {
            map_fd: fd.raw() as u32,
            key: key.as_ptr() as u64,
            value: value.as_ptr() as u64,
            flags: BPF_ANY,
            ..MapElemAttr::default()
        };
        sys_bpf("bpf(BPF_MAP_UPDATE_ELEM)", BPF_MAP_UPDATE_ELEM, &attr)?;
        Ok(())
    }

    fn close(&self, fd: MapFd) -> Result<(), KernelError> {
        // SAFETY: the caller holds exclusive ownership of `fd` and hands it
        // over here; it is not used again after this call.
        let rc = unsafe { libc::close(fd.raw()) };
        if rc != 0 {
            return Err(KernelError::Syscall {
                call: "close",
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}
