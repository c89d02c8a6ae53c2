//! The embedded runtime's primitive surface.
//!
//! Everything above this module is written against [`RuntimeApi`], so the
//! lifecycle logic can be exercised against [`crate::fake::FakeRuntime`]
//! without linking a real interpreter. A binding crate for a concrete
//! runtime implements this trait over that runtime's C API.

use std::ffi::CStr;
use std::os::raw::c_void;

use libc::wchar_t;

/// Version of the embedded runtime's C API, used for capability checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
}

impl ApiVersion {
    pub const fn new(major: u16, minor: u16) -> Self {
        ApiVersion { major, minor }
    }

    /// First version with a locale-aware argument decoder that allocates
    /// from the runtime's own heap.
    pub const DECODE_LOCALE: ApiVersion = ApiVersion::new(3, 5);

    /// First version with the combined "set argv, and choose whether the
    /// current directory joins the module search path" primitive.
    pub const SET_ARGV_EX: ApiVersion = ApiVersion::new(3, 1);
}

/// Opaque handle to a module object owned by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHandle(*mut c_void);

impl ModuleHandle {
    pub fn from_raw(ptr: *mut c_void) -> Self {
        ModuleHandle(ptr)
    }

    pub fn as_raw(self) -> *mut c_void {
        self.0
    }
}

/// The process-wide pointer-to-pointer bookkeeping cell.
///
/// The outer pointer identifies the cell; the inner pointer is the
/// internals object currently stored in it (null when none exists). At most
/// one cell exists per process.
pub type InternalsCell = *mut *mut c_void;

/// Identifier under which the internals cell may be stashed as a capsule in
/// the runtime's builtin namespace. Runtimes have moved this storage across
/// their own versions; see [`crate::interpreter::Interpreter::stop`].
pub const INTERNALS_ID: &str = "__ember_internals_v1__";

/// A wide string produced by the runtime's locale decoder, paired with the
/// deallocator matching how it was allocated. Dropping releases it with
/// exactly that routine, so allocation strategies never cross.
pub struct DecodedWide {
    ptr: *mut wchar_t,
    free: unsafe fn(*mut wchar_t),
}

impl DecodedWide {
    /// # Safety
    /// `ptr` must be a nul-terminated wide string that `free` can release,
    /// and nothing else may free it.
    pub unsafe fn from_raw(ptr: *mut wchar_t, free: unsafe fn(*mut wchar_t)) -> Self {
        DecodedWide { ptr, free }
    }

    pub fn as_ptr(&self) -> *const wchar_t {
        self.ptr
    }
}

impl Drop for DecodedWide {
    fn drop(&mut self) {
        unsafe { (self.free)(self.ptr) };
    }
}

/// Outcome of a native module initializer, in the runtime's own signaling
/// convention: a ready module object, or the import-failed signal carrying
/// the failure text.
#[derive(Debug)]
pub enum InitOutcome {
    Ready(ModuleHandle),
    ImportFailed(String),
}

/// A module initializer in the form the builtin-module table stores it.
pub type NativeInit = Box<dyn Fn() -> InitOutcome>;

/// The builtin-module table could not take another entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFull;

/// Primitive operations of the embedded runtime consumed by this crate.
///
/// The runtime is a process-wide singleton and none of these operations are
/// locked internally; the host serializes lifecycle calls.
pub trait RuntimeApi {
    /// C-API version of the runtime this instance talks to.
    fn version(&self) -> ApiVersion;

    /// Whether a session is currently initialized.
    fn is_initialized(&self) -> bool;

    /// Core initialization, optionally suppressing the runtime's own OS
    /// signal handler installation.
    ///
    /// If the runtime's initialization fails, the process terminates. That
    /// is the embedded runtime's own contract; implementations must not
    /// intercept it or convert it into a recoverable error.
    fn initialize(&mut self, install_signal_handlers: bool);

    /// Core finalization. Teardown may lazily create a fresh internals
    /// object as a side effect (an object's destructor querying for the
    /// internals forces creation).
    fn finalize(&mut self);

    /// Append an initializer to the builtin-module table. Only meaningful
    /// before initialization; can fail under memory pressure.
    fn append_builtin(&mut self, name: &str, init: NativeInit) -> Result<(), TableFull>;

    /// Decode a host C string into the runtime's wide encoding with its
    /// most robust locale-aware routine. `None` is the "no valid
    /// conversion" sentinel.
    ///
    /// Only present from [`ApiVersion::DECODE_LOCALE`] on.
    fn decode_locale(&self, arg: &CStr) -> Option<DecodedWide>;

    /// Combined set-argv primitive: installs the wide argument vector and
    /// decides whether the current directory joins the module search path.
    ///
    /// Only present from [`ApiVersion::SET_ARGV_EX`] on.
    fn set_argv_ex(&mut self, argv: &[*const wchar_t], add_cwd_to_path: bool);

    /// Plain set-argv primitive. Always prepends the current directory to
    /// the module search path.
    fn set_argv(&mut self, argv: &[*const wchar_t]);

    /// Remove the first entry of the module search path. Pairs with
    /// [`RuntimeApi::set_argv`] on runtimes without the combined primitive.
    fn pop_search_path_front(&mut self);

    /// Fetch the internals cell without creating an internals object as a
    /// side effect of looking. Null when the layer has no cell at all.
    fn internals_cell(&self) -> InternalsCell;

    /// Capture the current builtin namespace and, if it holds a capsule
    /// under `id`, return the cell smuggled inside it.
    fn builtins_capsule(&self, id: &str) -> Option<InternalsCell>;

    /// Release an internals object that was reachable through the cell.
    ///
    /// # Safety
    /// `ptr` must have been created by this runtime's embedding layer and
    /// not freed before.
    unsafe fn free_internals(&mut self, ptr: *mut c_void);
}
