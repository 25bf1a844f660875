//! Win32 implementation of the Pageant transport.
//!
//! - Host lookup: `FindWindowW(class, title)`
//! - Region: page-file backed `CreateFileMappingW` + `MapViewOfFile`
//! - Notification: `SendMessageW(hwnd, WM_COPYDATA, 0, &COPYDATASTRUCT)`

use std::ffi::c_void;
use std::io;
use std::iter;

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_ALREADY_EXISTS, HANDLE, HWND, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::System::DataExchange::COPYDATASTRUCT;
use windows_sys::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, UnmapViewOfFile, FILE_MAP_WRITE,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};
use windows_sys::Win32::System::Threading::GetCurrentThreadId;
use windows_sys::Win32::UI::WindowsAndMessaging::{FindWindowW, SendMessageW};

use super::{check_range, Backend, HostHandle, HostIdentity, SharedRegion};
use crate::error::{PageantError, Result};
use crate::protocol::{CopyDataRequest, WM_COPYDATA};

fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(iter::once(0)).collect()
}

/// The real Pageant transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32Backend;

impl Win32Backend {
    /// Create the backend. It holds no state.
    pub fn new() -> Self {
        Self
    }
}

impl Backend for Win32Backend {
    type Region = Win32Region;

    fn find_window(&self, identity: &HostIdentity) -> Option<HostHandle> {
        let class = to_wide(&identity.class);
        let title = to_wide(&identity.title);

        let hwnd = unsafe { FindWindowW(class.as_ptr(), title.as_ptr()) };
        if hwnd.is_null() {
            None
        } else {
            Some(HostHandle::from_raw(hwnd as usize))
        }
    }

    fn context_id(&self) -> u32 {
        unsafe { GetCurrentThreadId() }
    }

    fn create_region(&self, name: &str, size: usize) -> Result<Win32Region> {
        Win32Region::create(name, size)
    }

    fn send_copydata(&self, host: HostHandle, request: &CopyDataRequest) -> bool {
        let cds = COPYDATASTRUCT {
            dwData: request.magic() as usize,
            cbData: request.len(),
            lpData: request.data().as_ptr() as *mut c_void,
        };

        // SendMessageW blocks until Pageant's window procedure returns.
        let result = unsafe {
            SendMessageW(
                host.as_raw() as HWND,
                WM_COPYDATA,
                0,
                &cds as *const COPYDATASTRUCT as isize,
            )
        };
        result != 0
    }
}

/// Page-file backed named mapping, unmapped and closed on drop.
pub struct Win32Region {
    mapping: HANDLE,
    view: MEMORY_MAPPED_VIEW_ADDRESS,
    len: usize,
    name: String,
}

impl Win32Region {
    /// Create and map a named region of `size` bytes.
    pub fn create(name: &str, size: usize) -> Result<Self> {
        let wide_name = to_wide(name);

        let mapping = unsafe {
            CreateFileMappingW(
                INVALID_HANDLE_VALUE, // backed by the page file
                std::ptr::null(),     // default security
                PAGE_READWRITE,
                0,
                size as u32,
                wide_name.as_ptr(),
            )
        };
        if mapping.is_null() {
            return Err(PageantError::ResourceAllocation(io::Error::last_os_error()));
        }
        // A mapping with this name already exists and belongs to someone else.
        if unsafe { GetLastError() } == ERROR_ALREADY_EXISTS {
            unsafe { CloseHandle(mapping) };
            return Err(PageantError::ResourceAllocation(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("shared region {} already exists", name),
            )));
        }

        let view = unsafe { MapViewOfFile(mapping, FILE_MAP_WRITE, 0, 0, size) };
        if view.Value.is_null() {
            let err = io::Error::last_os_error();
            unsafe { CloseHandle(mapping) };
            return Err(PageantError::ResourceAllocation(err));
        }

        Ok(Self {
            mapping,
            view,
            len: size,
            name: name.to_string(),
        })
    }
}

impl SharedRegion for Win32Region {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.len
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        check_range(offset, data.len(), self.len)?;
        // SAFETY: the range was checked against the mapped size and the view
        // stays mapped for the lifetime of `self`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (self.view.Value as *mut u8).add(offset),
                data.len(),
            );
        }
        Ok(())
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        check_range(offset, buf.len(), self.len)?;
        // SAFETY: see `write_at`.
        unsafe {
            std::ptr::copy_nonoverlapping(
                (self.view.Value as *const u8).add(offset),
                buf.as_mut_ptr(),
                buf.len(),
            );
        }
        Ok(())
    }
}

impl Drop for Win32Region {
    fn drop(&mut self) {
        unsafe {
            UnmapViewOfFile(self.view);
            CloseHandle(self.mapping);
        }
    }
}
