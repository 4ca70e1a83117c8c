// Uinput constants and structures
#![allow(non_camel_case_types)]

use std::mem::size_of;

pub const UINPUT_MAX_NAME_SIZE: usize = 80;

pub const EV_UINPUT: u16 = 0x0101;
pub const UI_FF_UPLOAD: u16 = 1;
pub const UI_FF_ERASE: u16 = 2;

const IOC_NONE: u64 = 0;
const IOC_WRITE: u64 = 1;
const IOC_READ: u64 = 2;

// _IOC(dir, 'U', nr, size)
const fn ioc(dir: u64, nr: u64, size: usize) -> u64 {
    (dir << 30) | ((size as u64 & 0x3fff) << 16) | ((b'U' as u64) << 8) | nr
}

pub const UI_DEV_CREATE: u64 = ioc(IOC_NONE, 1, 0);
pub const UI_DEV_DESTROY: u64 = ioc(IOC_NONE, 2, 0);
pub const UI_DEV_SETUP: u64 = ioc(IOC_WRITE, 3, size_of::<uinput_setup>());
pub const UI_ABS_SETUP: u64 = ioc(IOC_WRITE, 4, size_of::<uinput_abs_setup>());

pub const UI_SET_EVBIT: u64 = ioc(IOC_WRITE, 100, size_of::<libc::c_int>());
pub const UI_SET_KEYBIT: u64 = ioc(IOC_WRITE, 101, size_of::<libc::c_int>());
pub const UI_SET_RELBIT: u64 = ioc(IOC_WRITE, 102, size_of::<libc::c_int>());
pub const UI_SET_ABSBIT: u64 = ioc(IOC_WRITE, 103, size_of::<libc::c_int>());
pub const UI_SET_MSCBIT: u64 = ioc(IOC_WRITE, 104, size_of::<libc::c_int>());
pub const UI_SET_LEDBIT: u64 = ioc(IOC_WRITE, 105, size_of::<libc::c_int>());
pub const UI_SET_SNDBIT: u64 = ioc(IOC_WRITE, 106, size_of::<libc::c_int>());
pub const UI_SET_FFBIT: u64 = ioc(IOC_WRITE, 107, size_of::<libc::c_int>());
pub const UI_SET_PHYS: u64 = ioc(IOC_WRITE, 108, size_of::<*const libc::c_char>());
pub const UI_SET_SWBIT: u64 = ioc(IOC_WRITE, 109, size_of::<libc::c_int>());
pub const UI_SET_PROPBIT: u64 = ioc(IOC_WRITE, 110, size_of::<libc::c_int>());

pub const UI_BEGIN_FF_UPLOAD: u64 = ioc(IOC_READ | IOC_WRITE, 200, size_of::<uinput_ff_upload>());
pub const UI_END_FF_UPLOAD: u64 = ioc(IOC_WRITE, 201, size_of::<uinput_ff_upload>());
pub const UI_BEGIN_FF_ERASE: u64 = ioc(IOC_READ | IOC_WRITE, 202, size_of::<uinput_ff_erase>());
pub const UI_END_FF_ERASE: u64 = ioc(IOC_WRITE, 203, size_of::<uinput_ff_erase>());

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct input_id {
    pub bustype: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

#[repr(C)]
#[derive(Debug)]
pub struct uinput_setup {
    pub id: input_id,
    pub name: [u8; UINPUT_MAX_NAME_SIZE],
    pub ff_effects_max: u32,
}
impl uinput_setup {
    /// Build the setup block, truncating `name` so a NUL terminator always fits
    pub fn new(id: input_id, name: &str, ff_effects_max: u32) -> Self {
        let mut buf = [0u8; UINPUT_MAX_NAME_SIZE];
        let bytes = name.as_bytes();
        let len = bytes.len().min(UINPUT_MAX_NAME_SIZE - 1);
        buf[..len].copy_from_slice(&bytes[..len]);
        Self {
            id,
            name: buf,
            ff_effects_max,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct input_absinfo {
    pub value: i32,
    pub minimum: i32,
    pub maximum: i32,
    pub fuzz: i32,
    pub flat: i32,
    pub resolution: i32,
}

#[repr(C)]
#[derive(Debug)]
pub struct uinput_abs_setup {
    pub code: u16,
    pub absinfo: input_absinfo,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct input_event {
    pub time: libc::timeval,
    pub type_: u16,
    pub code: u16,
    pub value: i32,
}
impl input_event {
    /// Event with a zero timestamp; the kernel stamps events written to uinput
    pub fn new(type_: u16, code: u16, value: i32) -> Self {
        Self {
            time: libc::timeval {
                tv_sec: 0,
                tv_usec: 0,
            },
            type_,
            code,
            value,
        }
    }
}

// Effect payloads are never inspected, only acknowledged, so the union is kept opaque.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ff_effect {
    pub type_: u16,
    pub id: i16,
    pub direction: u16,
    pub trigger: [u16; 2],
    pub replay: [u16; 2],
    pub u: [u64; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct uinput_ff_upload {
    pub request_id: u32,
    pub retval: i32,
    pub effect: ff_effect,
    pub old: ff_effect,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct uinput_ff_erase {
    pub request_id: u32,
    pub retval: i32,
    pub effect_id: u32,
}
