//! In-process agent host.
//!
//! [`LoopbackHost`] plays both sides of the Pageant transport inside one
//! process: it hands out named regions, answers `WM_COPYDATA`-style
//! notifications by opening the region named in the request, and writes its
//! reply back into the same region. The same wire checks Pageant applies are
//! enforced (magic value, NUL-terminated name, framed payload), so a query that
//! works here exercises the full client path.
//!
//! # Example
//!
//! ```
//! use pageant_client::transport::LoopbackHost;
//! use pageant_client::QueryChannel;
//!
//! let host = LoopbackHost::echo();
//! let channel = QueryChannel::new(host.clone());
//!
//! let response = channel.query(b"\x0b").unwrap();
//! assert_eq!(&response[..], b"\x0b");
//! assert_eq!(host.live_regions(), 0);
//! ```

use std::cell::Cell;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{check_range, Backend, HostHandle, HostIdentity, SharedRegion};
use crate::error::{PageantError, Result};
use crate::protocol::{
    decode_frame, encode_frame, CopyDataRequest, AGENT_COPYDATA_ID, LENGTH_PREFIX_SIZE,
};
use crate::sync::lock;

/// Window handle value the loopback host answers to.
const LOOPBACK_HWND: usize = 0x5041_4745;

type RawHandler = dyn Fn(&mut [u8]) -> bool + Send + Sync;

static NEXT_CONTEXT_ID: AtomicU32 = AtomicU32::new(0x1000);

thread_local! {
    static CONTEXT_ID: Cell<u32> = const { Cell::new(0) };
}

/// Per-thread identity, assigned on first use.
fn current_context_id() -> u32 {
    CONTEXT_ID.with(|id| {
        if id.get() == 0 {
            id.set(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        }
        id.get()
    })
}

type Memory = Arc<Mutex<Vec<u8>>>;

struct Inner {
    identity: Mutex<HostIdentity>,
    running: AtomicBool,
    handler: Box<RawHandler>,
    regions: Mutex<HashMap<String, Memory>>,
    regions_created: AtomicUsize,
    notified: Mutex<Vec<String>>,
}

/// In-process agent host emulation.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct LoopbackHost {
    inner: Arc<Inner>,
}

impl LoopbackHost {
    /// Host that answers each request payload with `respond(payload)`.
    ///
    /// Returning `None` makes the notification report failure, as Pageant
    /// does for requests it cannot serve.
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        Self::with_raw_handler(move |region| {
            let Ok(request) = decode_frame(region) else {
                return false;
            };
            let Some(response) = respond(&request) else {
                return false;
            };
            let Ok(frame) = encode_frame(&response) else {
                return false;
            };
            if frame.len() > region.len() {
                return false;
            }
            region[..frame.len()].copy_from_slice(&frame);
            true
        })
    }

    /// Host that sends every payload back unchanged.
    pub fn echo() -> Self {
        Self::new(|request| Some(request.to_vec()))
    }

    /// Host with direct access to the whole region, framing included.
    ///
    /// Useful for emulating hosts that break the framing contract.
    pub fn with_raw_handler<F>(handler: F) -> Self
    where
        F: Fn(&mut [u8]) -> bool + Send + Sync + 'static,
    {
        Self::build(HostIdentity::default(), Box::new(handler))
    }

    /// Answer only to the given window identity instead of the default.
    pub fn set_identity(&self, identity: HostIdentity) {
        *lock(&self.inner.identity) = identity;
    }

    fn build(identity: HostIdentity, handler: Box<RawHandler>) -> Self {
        Self {
            inner: Arc::new(Inner {
                identity: Mutex::new(identity),
                running: AtomicBool::new(true),
                handler,
                regions: Mutex::new(HashMap::new()),
                regions_created: AtomicUsize::new(0),
                notified: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start or stop answering window lookups.
    pub fn set_running(&self, running: bool) {
        self.inner.running.store(running, Ordering::SeqCst);
    }

    /// Whether the host currently answers window lookups.
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Regions created and not yet released.
    pub fn live_regions(&self) -> usize {
        lock(&self.inner.regions).len()
    }

    /// Total regions ever created.
    pub fn regions_created(&self) -> usize {
        self.inner.regions_created.load(Ordering::SeqCst)
    }

    /// Region names seen in notifications, in arrival order.
    pub fn notified_regions(&self) -> Vec<String> {
        lock(&self.inner.notified).clone()
    }
}

impl std::fmt::Debug for LoopbackHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackHost")
            .field("identity", &*lock(&self.inner.identity))
            .field("running", &self.is_running())
            .field("live_regions", &self.live_regions())
            .finish()
    }
}

impl Backend for LoopbackHost {
    type Region = LoopbackRegion;

    fn find_window(&self, identity: &HostIdentity) -> Option<HostHandle> {
        if self.is_running() && *identity == *lock(&self.inner.identity) {
            Some(HostHandle::from_raw(LOOPBACK_HWND))
        } else {
            None
        }
    }

    fn context_id(&self) -> u32 {
        current_context_id()
    }

    fn create_region(&self, name: &str, size: usize) -> Result<LoopbackRegion> {
        let memory = Arc::new(Mutex::new(vec![0u8; size]));

        let mut regions = lock(&self.inner.regions);
        if regions.contains_key(name) {
            return Err(PageantError::ResourceAllocation(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("shared region {} already exists", name),
            )));
        }
        regions.insert(name.to_string(), memory.clone());
        self.inner.regions_created.fetch_add(1, Ordering::SeqCst);

        Ok(LoopbackRegion {
            name: name.to_string(),
            memory,
            host: self.inner.clone(),
        })
    }

    fn send_copydata(&self, host: HostHandle, request: &CopyDataRequest) -> bool {
        if host.as_raw() != LOOPBACK_HWND || request.magic() != AGENT_COPYDATA_ID {
            return false;
        }
        let Some(name) = request.region_name() else {
            return false;
        };
        lock(&self.inner.notified).push(name.to_string());

        // Clone the handle out so concurrent queries do not serialize here.
        let Some(memory) = lock(&self.inner.regions).get(name).cloned() else {
            return false;
        };
        let mut region = lock(&memory);
        if region.len() < LENGTH_PREFIX_SIZE {
            return false;
        }
        (self.inner.handler)(region.as_mut_slice())
    }
}

/// Region handed out by [`LoopbackHost`], unregistered on drop.
pub struct LoopbackRegion {
    name: String,
    memory: Memory,
    host: Arc<Inner>,
}

impl SharedRegion for LoopbackRegion {
    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        lock(&self.memory).len()
    }

    fn write_at(&mut self, offset: usize, data: &[u8]) -> Result<()> {
        let mut memory = lock(&self.memory);
        check_range(offset, data.len(), memory.len())?;
        memory[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<()> {
        let memory = lock(&self.memory);
        check_range(offset, buf.len(), memory.len())?;
        buf.copy_from_slice(&memory[offset..offset + buf.len()]);
        Ok(())
    }
}

impl Drop for LoopbackRegion {
    fn drop(&mut self) {
        lock(&self.host.regions).remove(&self.name);
    }
}
