//! A deterministic in-process stand-in for the embedded runtime.
//!
//! Implements [`RuntimeApi`] far enough to exercise every lifecycle path
//! without linking a real interpreter: the builtin-module table, wide
//! argument delivery, imports of registered modules, and the internals
//! cell — including the capsule stash and the "internals created during
//! finalize" teardown quirk of real runtimes. Wide strings on the decoder
//! path are allocated with `libc::malloc` and released through the
//! deallocator captured in [`DecodedWide`], so allocator pairing is
//! exercised for real.
//!
//! Misuse that a real runtime would turn into undefined behavior (calling a
//! primitive the advertised version does not have, importing without a
//! session) panics instead.

use std::ffi::CStr;
use std::mem;
use std::os::raw::c_void;
use std::ptr;

use libc::wchar_t;

use crate::runtime::{
    ApiVersion, DecodedWide, InitOutcome, InternalsCell, ModuleHandle, NativeInit, RuntimeApi,
    TableFull, INTERNALS_ID,
};

/// What a real embedding layer would keep in its internals object.
struct FakeInternals {
    _registry: u64,
}

/// Where the builtins capsule points, relative to the plain cell lookup.
#[derive(Clone, Copy)]
enum CapsuleStash {
    /// No capsule in the builtin namespace.
    Absent,
    /// The cell moved into builtins; the plain lookup cannot see it.
    Moved,
    /// Both locations resolve, to distinct cells: the capsule carries its
    /// own cell while the plain lookup still returns the old one.
    Split { cell: InternalsCell },
}

/// Deallocator paired with `libc::malloc` on the fake's decoder path.
unsafe fn free_wide(ptr: *mut wchar_t) {
    libc::free(ptr as *mut c_void);
}

/// Read a nul-terminated wide string back into host text.
unsafe fn read_wide(ptr: *const wchar_t) -> String {
    let mut out = String::new();
    let mut i = 0;
    loop {
        let w = *ptr.add(i);
        if w == 0 {
            break;
        }
        out.push(char::from_u32(w as u32).unwrap_or('\u{fffd}'));
        i += 1;
    }
    out
}

pub struct FakeRuntime {
    version: ApiVersion,
    initialized: bool,
    table: Vec<(String, NativeInit)>,
    fail_next_append: bool,

    // Behavior switches.
    capsule: CapsuleStash,
    recreate_in_finalize: bool,

    // Observations for assertions.
    argv: Option<Vec<String>>,
    cwd_on_path: Option<bool>,
    signal_handlers: Option<bool>,
    path_pops: u32,
    finalize_count: u32,

    // The process-wide cell, heap-allocated so lifecycle code can hold the
    // raw pointer across `finalize`.
    cell: InternalsCell,
    live_internals: usize,
    freed_internals: usize,
}

impl FakeRuntime {
    /// A fake speaking a modern C API (decoder and combined set-argv both
    /// present).
    pub fn new() -> Self {
        Self::with_version(ApiVersion::new(3, 10))
    }

    pub fn with_version(version: ApiVersion) -> Self {
        FakeRuntime {
            version,
            initialized: false,
            table: Vec::new(),
            fail_next_append: false,
            capsule: CapsuleStash::Absent,
            recreate_in_finalize: false,
            argv: None,
            cwd_on_path: None,
            signal_handlers: None,
            path_pops: 0,
            finalize_count: 0,
            cell: Box::into_raw(Box::new(ptr::null_mut())),
            live_internals: 0,
            freed_internals: 0,
        }
    }

    /// Make the next builtin-table append fail, as under memory pressure.
    pub fn fail_next_append(&mut self) {
        self.fail_next_append = true;
    }

    /// Hide the cell from the pointer-to-pointer lookup and expose it only
    /// as a capsule in the builtin namespace instead.
    pub fn stash_internals_in_capsule(&mut self, on: bool) {
        self.capsule = if on {
            CapsuleStash::Moved
        } else {
            CapsuleStash::Absent
        };
    }

    /// Put an internals object in the plain cell and a second, distinct
    /// cell with its own object behind the builtins capsule. Models a
    /// runtime whose internals storage moved between its own versions while
    /// the old lookup still resolves to a stale cell.
    pub fn stash_second_cell_in_capsule(&mut self) {
        self.force_internals();
        let obj = self.new_internals();
        self.capsule = CapsuleStash::Split {
            cell: Box::into_raw(Box::new(obj)),
        };
    }

    /// Have `finalize` lazily create a fresh internals object, the way a
    /// teardown path that queries for the internals does.
    pub fn recreate_internals_during_finalize(&mut self, on: bool) {
        self.recreate_in_finalize = on;
    }

    /// Create an internals object in the cell, as embedding-layer
    /// bookkeeping would during a session.
    pub fn force_internals(&mut self) {
        unsafe {
            if (*self.cell).is_null() {
                *self.cell = self.new_internals();
            }
        }
    }

    fn new_internals(&mut self) -> *mut c_void {
        self.live_internals += 1;
        Box::into_raw(Box::new(FakeInternals { _registry: 0 })) as *mut c_void
    }

    /// Whether the cell seen by the plain lookup still holds an object.
    pub fn plain_cell_occupied(&self) -> bool {
        unsafe { !(*self.cell).is_null() }
    }

    /// Whether the cell smuggled through the capsule still holds an
    /// object. The moved case shares the plain cell.
    pub fn capsule_cell_occupied(&self) -> bool {
        match self.capsule {
            CapsuleStash::Absent => false,
            CapsuleStash::Moved => self.plain_cell_occupied(),
            CapsuleStash::Split { cell } => unsafe { !(*cell).is_null() },
        }
    }

    /// Run the registered initializer for `name`, the way the runtime would
    /// on first import. `None` means no such builtin module.
    pub fn import(&self, name: &str) -> Option<InitOutcome> {
        assert!(self.initialized, "import requires a running session");
        let (_, init) = self.table.iter().find(|(n, _)| n == name)?;
        Some(init())
    }

    /// Arguments delivered by the encoder, decoded back to host text.
    /// `None` until a delivery happens (or after one was abandoned).
    pub fn argv(&self) -> Option<Vec<String>> {
        self.argv.clone()
    }

    /// Whether the current directory ended up on the module search path.
    pub fn cwd_on_path(&self) -> Option<bool> {
        self.cwd_on_path
    }

    /// Signal-handler choice recorded at the last initialize.
    pub fn signal_handlers(&self) -> Option<bool> {
        self.signal_handlers
    }

    pub fn path_pops(&self) -> u32 {
        self.path_pops
    }

    pub fn finalize_count(&self) -> u32 {
        self.finalize_count
    }

    /// Internals objects currently alive. Zero after a clean stop.
    pub fn live_internals(&self) -> usize {
        self.live_internals
    }

    /// Internals objects released so far; never more than once per object.
    pub fn freed_internals(&self) -> usize {
        self.freed_internals
    }

    fn record_argv(&mut self, argv: &[*const wchar_t]) {
        self.argv = Some(argv.iter().map(|&p| unsafe { read_wide(p) }).collect());
    }
}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeApi for FakeRuntime {
    fn version(&self) -> ApiVersion {
        self.version
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn initialize(&mut self, install_signal_handlers: bool) {
        self.initialized = true;
        self.signal_handlers = Some(install_signal_handlers);
        self.argv = None;
        self.cwd_on_path = None;
    }

    fn finalize(&mut self) {
        assert!(self.initialized, "finalize without a session");
        self.initialized = false;
        self.finalize_count += 1;
        if self.recreate_in_finalize {
            // Teardown of some object queried for the internals and forced
            // a fresh one into the cell.
            self.force_internals();
        }
    }

    fn append_builtin(&mut self, name: &str, init: NativeInit) -> Result<(), TableFull> {
        if self.fail_next_append {
            self.fail_next_append = false;
            return Err(TableFull);
        }
        self.table.push((name.to_owned(), init));
        Ok(())
    }

    fn decode_locale(&self, arg: &CStr) -> Option<DecodedWide> {
        assert!(
            self.version >= ApiVersion::DECODE_LOCALE,
            "locale decoder not present in API {}.{}",
            self.version.major,
            self.version.minor
        );
        let text = arg.to_str().ok()?;
        unsafe {
            let n = text.chars().count();
            let buf = libc::malloc((n + 1) * mem::size_of::<wchar_t>()) as *mut wchar_t;
            if buf.is_null() {
                return None;
            }
            for (i, ch) in text.chars().enumerate() {
                *buf.add(i) = ch as wchar_t;
            }
            *buf.add(n) = 0;
            Some(DecodedWide::from_raw(buf, free_wide))
        }
    }

    fn set_argv_ex(&mut self, argv: &[*const wchar_t], add_cwd_to_path: bool) {
        assert!(
            self.version >= ApiVersion::SET_ARGV_EX,
            "combined set-argv not present in API {}.{}",
            self.version.major,
            self.version.minor
        );
        self.record_argv(argv);
        self.cwd_on_path = Some(add_cwd_to_path);
    }

    fn set_argv(&mut self, argv: &[*const wchar_t]) {
        self.record_argv(argv);
        self.cwd_on_path = Some(true);
    }

    fn pop_search_path_front(&mut self) {
        assert_eq!(
            self.cwd_on_path,
            Some(true),
            "nothing on the search path front to pop"
        );
        self.cwd_on_path = Some(false);
        self.path_pops += 1;
    }

    fn internals_cell(&self) -> InternalsCell {
        match self.capsule {
            // The cell moved into the builtin namespace; the plain lookup
            // cannot see it.
            CapsuleStash::Moved => ptr::null_mut(),
            CapsuleStash::Absent | CapsuleStash::Split { .. } => self.cell,
        }
    }

    fn builtins_capsule(&self, id: &str) -> Option<InternalsCell> {
        if id != INTERNALS_ID {
            return None;
        }
        match self.capsule {
            CapsuleStash::Absent => None,
            CapsuleStash::Moved => Some(self.cell),
            CapsuleStash::Split { cell } => Some(cell),
        }
    }

    unsafe fn free_internals(&mut self, ptr: *mut c_void) {
        drop(Box::from_raw(ptr as *mut FakeInternals));
        self.live_internals -= 1;
        self.freed_internals += 1;
    }
}

impl Drop for FakeRuntime {
    fn drop(&mut self) {
        unsafe {
            release_cell(self.cell);
            if let CapsuleStash::Split { cell } = self.capsule {
                release_cell(cell);
            }
        }
    }
}

unsafe fn release_cell(cell: InternalsCell) {
    let internals = *cell;
    if !internals.is_null() {
        drop(Box::from_raw(internals as *mut FakeInternals));
    }
    drop(Box::from_raw(cell));
}

/// Handle for tests and demos that need a module object without a real
/// runtime allocation behind it.
pub fn dummy_module() -> ModuleHandle {
    static STUB: u8 = 0;
    ModuleHandle::from_raw(&STUB as *const u8 as *mut u8 as *mut c_void)
}
