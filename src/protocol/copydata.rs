//! `WM_COPYDATA` notification payload and shared region naming.
//!
//! Pageant never receives the message bytes through the window message.
//! The notification only carries the name of the shared region holding the
//! request frame; Pageant opens that region by name, answers in place and
//! returns from `SendMessage`.

/// Window message code for `WM_COPYDATA`.
pub const WM_COPYDATA: u32 = 74;

/// `dwData` magic identifying an agent query.
pub const AGENT_COPYDATA_ID: u32 = 0x804E_50BA;

/// Prefix of every shared region name.
pub const REGION_NAME_PREFIX: &str = "PageantRequest";

/// Window class and title Pageant registers.
pub const DEFAULT_WINDOW_NAME: &str = "Pageant";

/// Build the shared region name for a calling context.
///
/// ```
/// use pageant_client::protocol::region_name;
///
/// assert_eq!(region_name(0x1a2b), "PageantRequest00001a2b");
/// ```
pub fn region_name(context_id: u32) -> String {
    format!("{}{:08x}", REGION_NAME_PREFIX, context_id)
}

/// Contents of the `COPYDATASTRUCT` sent to Pageant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyDataRequest {
    magic: u32,
    name: Vec<u8>,
}

impl CopyDataRequest {
    /// Create a request referencing the named region.
    ///
    /// The name is stored NUL-terminated, which is what `cbData` counts.
    pub fn new(region_name: &str) -> Self {
        let mut name = Vec::with_capacity(region_name.len() + 1);
        name.extend_from_slice(region_name.as_bytes());
        name.push(0);
        Self {
            magic: AGENT_COPYDATA_ID,
            name,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_magic(mut self, magic: u32) -> Self {
        self.magic = magic;
        self
    }

    /// Value for `dwData`.
    #[inline]
    pub fn magic(&self) -> u32 {
        self.magic
    }

    /// Value for `cbData`: name length including the terminating NUL.
    #[inline]
    pub fn len(&self) -> u32 {
        self.name.len() as u32
    }

    /// Always false; the NUL terminator is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Bytes `lpData` points at, NUL included.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.name
    }

    /// Region name without the terminator.
    pub fn region_name(&self) -> Option<&str> {
        let (last, name) = self.name.split_last()?;
        if *last != 0 {
            return None;
        }
        std::str::from_utf8(name).ok()
    }
}
