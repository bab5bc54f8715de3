use std::ffi::c_void;
use std::io::Error;

/// A reservation of `len` anonymous, `PROT_NONE` bytes pinned at an exact address.
///
/// Unlike a typical RAII mapping wrapper this type does not unmap on drop: the region
/// table owns the unmap call explicitly, both to keep `unregister_device` synchronous and
/// to avoid a fault handler racing a reservation being torn down mid-drop.
#[derive(Debug)]
pub struct Reservation {
    base: usize,
    len: usize,
}

impl Reservation {
    pub fn base(&self) -> usize {
        self.base
    }

    pub fn len(&self) -> usize {
        self.len
    }
}

/// Reserve `len` bytes of completely inaccessible memory starting exactly at `base`.
///
/// Fails if the kernel cannot place the mapping at that exact address (e.g. something
/// else already occupies it), matching the reference implementation's strict-address
/// behavior: a device's numeric base address must equal the virtual address the driver
/// dereferences.
///
/// # Safety
/// `base` must not overlap memory the caller still needs; `MAP_FIXED` silently replaces
/// whatever was mapped there.
pub unsafe fn reserve_at(base: usize, len: usize) -> std::io::Result<Reservation> {
    let addr = libc::mmap(
        base as *mut c_void,
        len,
        libc::PROT_NONE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED,
        -1,
        0,
    );

    if addr == libc::MAP_FAILED {
        return Err(Error::last_os_error());
    }

    Ok(Reservation {
        base: addr as usize,
        len,
    })
}

/// Release a reservation previously returned by [`reserve_at`].
///
/// # Safety
/// Must only be called once per reservation, after which `reservation.base()` is no
/// longer valid memory.
pub unsafe fn release(reservation: &Reservation) -> std::io::Result<()> {
    let ret = libc::munmap(reservation.base as *mut c_void, reservation.len);

    if ret != 0 {
        return Err(Error::last_os_error());
    }

    Ok(())
}

/// The OS page size, used to validate that device windows are page-aligned.
pub fn page_size() -> usize {
    let ret = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if ret <= 0 {
        // sysconf(_SC_PAGESIZE) failing is not something any real Linux system does; fall
        // back to the overwhelmingly common page size rather than plumb an error through
        // every caller for a case that cannot happen in practice.
        4096
    } else {
        ret as usize
    }
}
