#![allow(clippy::missing_safety_doc)]

use std::ptr;
use std::sync::Arc;

use gamepals_arbitrator::{ActionConversionManager, CommandArbitrator, ExternalActor, VirtualGamepad};
use gamepals_core::{ActionInput, ArbitrationCfg, ArbitrationError, GameAction, InputType};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// FFI ABI version for gamepals_ffi.
///
/// Bump this when any `#[repr(C)]` struct layout or exported function signature changes.
pub const GAMEPALS_FFI_VERSION: u32 = 1;

/// Null handle or pointer argument.
pub const GP_ERR_NULL: i32 = -1;
/// String argument is not UTF-8.
pub const GP_ERR_UTF8: i32 = -2;
/// A roster refused the actor (exclusivity).
pub const GP_ERR_ROSTER_FULL: i32 = -3;
/// Registration after `gamepals_arbitrator_start`.
pub const GP_ERR_STARTED: i32 = -4;
/// Actor index out of range.
pub const GP_ERR_NO_ACTOR: i32 = -5;
/// Any other arbitration error.
pub const GP_ERR_OTHER: i32 = -6;

#[no_mangle]
pub extern "C" fn gamepals_ffi_version() -> u32 {
    GAMEPALS_FFI_VERSION
}

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Returns 0 when installed, 1 when a global subscriber already existed.
#[no_mangle]
pub extern "C" fn gamepals_init_logging() -> i32 {
    match tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
    {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

/// Opaque handle exposed over FFI.
pub struct GpArbitrator {
    inner: Arc<CommandArbitrator>,
    gamepad: Arc<VirtualGamepad>,
    actors: Vec<Arc<ExternalActor>>,
}

/// FFI string view (UTF-8 bytes).
#[repr(C)]
#[derive(Clone, Copy)]
pub struct GpStr {
    pub ptr: *const u8,
    pub len: usize,
}

impl GpStr {
    /// `Err` carries the FFI error code.
    unsafe fn as_str<'a>(&self) -> Result<&'a str, i32> {
        if self.ptr.is_null() {
            return Err(GP_ERR_NULL);
        }
        let bytes = std::slice::from_raw_parts(self.ptr, self.len);
        std::str::from_utf8(bytes).map_err(|_| GP_ERR_UTF8)
    }
}

/// One actuated controller input. `input` is an `InputType` code.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpCommand {
    pub input: u32,
    pub value: f32,
}

/// Owned array returned over FFI; free with `gamepals_commands_free`.
#[repr(C)]
pub struct GpCommandArray {
    pub ptr: *mut GpCommand,
    pub len: usize,
}

/// Owned byte buffer; free with `gamepals_bytes_free`.
#[repr(C)]
pub struct GpBytes {
    pub ptr: *mut u8,
    pub len: usize,
}

fn error_code(e: &ArbitrationError) -> i32 {
    match e {
        ArbitrationError::RosterFull { .. } => GP_ERR_ROSTER_FULL,
        ArbitrationError::AlreadyStarted => GP_ERR_STARTED,
        _ => GP_ERR_OTHER,
    }
}

/// Create an arbitrator from a JSON configuration document.
///
/// Commands go to an in-memory virtual gamepad; read them back with
/// `gamepals_drain_commands`. Returns null on an invalid document.
#[no_mangle]
pub unsafe extern "C" fn gamepals_arbitrator_new(config_json: GpStr) -> *mut GpArbitrator {
    let text = match config_json.as_str() {
        Ok(t) => t,
        Err(_) => return ptr::null_mut(),
    };
    let cfg = match ArbitrationCfg::from_json(text) {
        Ok(c) => Arc::new(c),
        Err(e) => {
            warn!(error = %e, "rejected configuration");
            return ptr::null_mut();
        }
    };

    let conversion = Arc::new(ActionConversionManager::new(cfg.clone(), Vec::new()));
    let gamepad = Arc::new(VirtualGamepad::new());
    let inner = CommandArbitrator::new(cfg, conversion, gamepad.clone());

    Box::into_raw(Box::new(GpArbitrator {
        inner,
        gamepad,
        actors: Vec::new(),
    }))
}

#[no_mangle]
pub unsafe extern "C" fn gamepals_arbitrator_free(h: *mut GpArbitrator) {
    if !h.is_null() {
        drop(Box::from_raw(h));
    }
}

/// Register an externally driven actor controlling `actions_len` actions.
///
/// Returns the actor index (>= 0) used by the push functions, or a negative
/// `GP_ERR_*` code. Must not race with other calls on the same handle.
#[no_mangle]
pub unsafe extern "C" fn gamepals_actor_register(
    h: *mut GpArbitrator,
    name: GpStr,
    actions_ptr: *const GpStr,
    actions_len: usize,
) -> i32 {
    if h.is_null() || (actions_ptr.is_null() && actions_len > 0) {
        return GP_ERR_NULL;
    }
    let handle = &mut *h;

    let name = match name.as_str() {
        Ok(n) => n,
        Err(rc) => return rc,
    };
    let mut actions: Vec<GameAction> = Vec::with_capacity(actions_len);
    if actions_len > 0 {
        for a in std::slice::from_raw_parts(actions_ptr, actions_len) {
            match a.as_str() {
                Ok(s) => actions.push(GameAction::from(s)),
                Err(rc) => return rc,
            }
        }
    }

    let actor = Arc::new(ExternalActor::new(name, actions));
    if let Err(e) = handle.inner.add_actor(actor.clone()) {
        warn!(actor = name, error = %e, "registration failed");
        return error_code(&e);
    }
    handle.actors.push(actor);
    (handle.actors.len() - 1) as i32
}

/// Start the arbitrator and every registered actor. Idempotent.
#[no_mangle]
pub unsafe extern "C" fn gamepals_arbitrator_start(h: *const GpArbitrator) -> i32 {
    if h.is_null() {
        return GP_ERR_NULL;
    }
    (*h).inner.start();
    0
}

unsafe fn actor_at<'a>(h: *const GpArbitrator, actor: u32) -> Result<&'a ExternalActor, i32> {
    if h.is_null() {
        return Err(GP_ERR_NULL);
    }
    (&(*h).actors)
        .get(actor as usize)
        .map(Arc::as_ref)
        .ok_or(GP_ERR_NO_ACTOR)
}

/// Propose `value` for `action` on behalf of actor `actor`.
///
/// Safe to call from several threads at once; updates to one action serialize
/// inside the arbitrator.
#[no_mangle]
pub unsafe extern "C" fn gamepals_push_input(
    h: *const GpArbitrator,
    actor: u32,
    action: GpStr,
    value: f32,
    confidence: f32,
) -> i32 {
    let a = match actor_at(h, actor) {
        Ok(a) => a,
        Err(rc) => return rc,
    };
    let action = match action.as_str() {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    a.push(ActionInput::new(action, value), confidence);
    0
}

/// Send an out-of-band message (e.g. "RESET") from actor `actor`.
#[no_mangle]
pub unsafe extern "C" fn gamepals_push_message(
    h: *const GpArbitrator,
    actor: u32,
    message: GpStr,
) -> i32 {
    let a = match actor_at(h, actor) {
        Ok(a) => a,
        Err(rc) => return rc,
    };
    match message.as_str() {
        Ok(m) => {
            a.push_message(m);
            0
        }
        Err(rc) => rc,
    }
}

/// Take every command actuated since the last drain, oldest first.
#[no_mangle]
pub unsafe extern "C" fn gamepals_drain_commands(h: *const GpArbitrator) -> GpCommandArray {
    if h.is_null() {
        return GpCommandArray {
            ptr: ptr::null_mut(),
            len: 0,
        };
    }
    let out: Vec<GpCommand> = (*h)
        .gamepad
        .drain_history()
        .into_iter()
        .map(|c| GpCommand {
            input: c.kind.code(),
            value: c.value,
        })
        .collect();

    // Leak to caller; freed by gamepals_commands_free
    let mut boxed = out.into_boxed_slice();
    let arr = GpCommandArray {
        ptr: boxed.as_mut_ptr(),
        len: boxed.len(),
    };
    std::mem::forget(boxed);
    arr
}

#[no_mangle]
pub unsafe extern "C" fn gamepals_commands_free(arr: GpCommandArray) {
    if !arr.ptr.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(arr.ptr, arr.len);
        drop(Box::from_raw(slice_ptr));
    }
}

/// Per-actor records as a JSON document (UTF-8, not NUL-terminated).
#[no_mangle]
pub unsafe extern "C" fn gamepals_snapshot_json(h: *const GpArbitrator) -> GpBytes {
    let empty = GpBytes {
        ptr: ptr::null_mut(),
        len: 0,
    };
    if h.is_null() {
        return empty;
    }
    let buf = match serde_json::to_vec(&(*h).inner.snapshot()) {
        Ok(b) => b,
        Err(e) => {
            warn!(error = %e, "snapshot serialization failed");
            return empty;
        }
    };

    let mut boxed = buf.into_boxed_slice();
    let out = GpBytes {
        ptr: boxed.as_mut_ptr(),
        len: boxed.len(),
    };
    std::mem::forget(boxed);
    out
}

#[no_mangle]
pub unsafe extern "C" fn gamepals_bytes_free(b: GpBytes) {
    if !b.ptr.is_null() {
        let slice_ptr = ptr::slice_from_raw_parts_mut(b.ptr, b.len);
        drop(Box::from_raw(slice_ptr));
    }
}

/// Static name of an input code (e.g. "BTN_A"), or an empty view for unknown codes.
#[no_mangle]
pub extern "C" fn gamepals_input_type_name(code: u32) -> GpStr {
    match InputType::from_code(code) {
        Some(t) => {
            let s = t.as_str();
            GpStr {
                ptr: s.as_ptr(),
                len: s.len(),
            }
        }
        None => GpStr {
            ptr: ptr::null(),
            len: 0,
        },
    }
}
