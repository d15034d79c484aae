//! CoreFoundation plumbing for the macOS backend: owned references,
//! dictionary lookups and array walking over raw `CFTypeRef`s.

#![cfg(target_os = "macos")]

use std::ffi::c_void;
use std::ptr::NonNull;

pub(crate) type CFTypeRef = *const c_void;
pub(crate) type CFArrayRef = *const c_void;
pub(crate) type CFDictionaryRef = *const c_void;
pub(crate) type CFStringRef = *const c_void;
type CFNumberRef = *const c_void;

const K_CF_STRING_ENCODING_UTF8: u32 = 0x0800_0100;
const K_CF_NUMBER_SINT32_TYPE: isize = 3;
const K_CF_NUMBER_SINT64_TYPE: isize = 4;
const K_CF_NUMBER_FLOAT64_TYPE: isize = 13;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CGPoint {
    pub x: f64,
    pub y: f64,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CGSize {
    pub width: f64,
    pub height: f64,
}

#[repr(C)]
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct CGRect {
    pub origin: CGPoint,
    pub size: CGSize,
}

#[repr(C)]
struct CFArrayCallBacks {
    _private: [u8; 0],
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    static kCFTypeArrayCallBacks: CFArrayCallBacks;

    fn CFRelease(cf: CFTypeRef);
    fn CFBooleanGetValue(boolean: CFTypeRef) -> bool;
    fn CFArrayCreate(
        alloc: *const c_void,
        values: *const CFTypeRef,
        count: isize,
        callbacks: *const CFArrayCallBacks,
    ) -> CFArrayRef;
    fn CFArrayGetCount(array: CFArrayRef) -> isize;
    fn CFArrayGetValueAtIndex(array: CFArrayRef, index: isize) -> CFTypeRef;
    fn CFDictionaryGetValue(dict: CFDictionaryRef, key: CFTypeRef) -> CFTypeRef;
    fn CFNumberCreate(alloc: *const c_void, the_type: isize, value: *const c_void) -> CFNumberRef;
    fn CFNumberGetValue(number: CFNumberRef, the_type: isize, value: *mut c_void) -> bool;
    fn CFStringCreateWithBytes(
        alloc: *const c_void,
        bytes: *const u8,
        num_bytes: isize,
        encoding: u32,
        is_external: bool,
    ) -> CFStringRef;
    fn CFStringGetLength(s: CFStringRef) -> isize;
    fn CFStringGetMaximumSizeForEncoding(length: isize, encoding: u32) -> isize;
    fn CFStringGetCString(s: CFStringRef, buffer: *mut u8, size: isize, encoding: u32) -> bool;
}

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGRectMakeWithDictionaryRepresentation(dict: CFDictionaryRef, rect: *mut CGRect) -> bool;
}

/// A reference obtained from a Create/Copy function, released on drop.
pub(crate) struct CfOwned(NonNull<c_void>);

impl CfOwned {
    /// Takes ownership of `raw`; `None` for null.
    pub(crate) fn new(raw: CFTypeRef) -> Option<Self> {
        NonNull::new(raw as *mut c_void).map(Self)
    }

    pub(crate) fn as_ptr(&self) -> CFTypeRef {
        self.0.as_ptr()
    }
}

impl Drop for CfOwned {
    fn drop(&mut self) {
        unsafe { CFRelease(self.0.as_ptr()) }
    }
}

pub(crate) fn cfstr(s: &str) -> Option<CfOwned> {
    CfOwned::new(unsafe {
        CFStringCreateWithBytes(
            std::ptr::null(),
            s.as_ptr(),
            s.len() as isize,
            K_CF_STRING_ENCODING_UTF8,
            false,
        )
    })
}

pub(crate) fn cfnumber_i32(value: i32) -> Option<CfOwned> {
    CfOwned::new(unsafe {
        CFNumberCreate(
            std::ptr::null(),
            K_CF_NUMBER_SINT32_TYPE,
            &value as *const i32 as *const c_void,
        )
    })
}

/// A CFArray holding (and retaining) `values`.
pub(crate) fn cfarray(values: &[&CfOwned]) -> Option<CfOwned> {
    let raw: Vec<CFTypeRef> = values.iter().map(|v| v.as_ptr()).collect();
    CfOwned::new(unsafe {
        CFArrayCreate(
            std::ptr::null(),
            raw.as_ptr(),
            raw.len() as isize,
            &kCFTypeArrayCallBacks,
        )
    })
}

/// Borrowed elements of `array`; valid while the array is alive.
pub(crate) fn array_items(array: CFArrayRef) -> Vec<CFTypeRef> {
    if array.is_null() {
        return Vec::new();
    }
    let count = unsafe { CFArrayGetCount(array) };
    (0..count)
        .map(|i| unsafe { CFArrayGetValueAtIndex(array, i) })
        .filter(|v| !v.is_null())
        .collect()
}

/// Dictionary keys used by the backend, created once per query.
pub(crate) struct Keys(Vec<(&'static str, CfOwned)>);

impl Keys {
    pub(crate) fn new(names: &[&'static str]) -> Self {
        Self(
            names
                .iter()
                .filter_map(|&name| cfstr(name).map(|key| (name, key)))
                .collect(),
        )
    }

    fn get(&self, name: &str) -> Option<CFTypeRef> {
        self.0
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, key)| key.as_ptr())
    }

    pub(crate) fn value(&self, dict: CFDictionaryRef, name: &str) -> Option<CFTypeRef> {
        let key = self.get(name)?;
        let value = unsafe { CFDictionaryGetValue(dict, key) };
        (!value.is_null()).then_some(value)
    }

    pub(crate) fn i32(&self, dict: CFDictionaryRef, name: &str) -> Option<i32> {
        number_value(self.value(dict, name)?, K_CF_NUMBER_SINT32_TYPE, 0i32)
    }

    pub(crate) fn u64(&self, dict: CFDictionaryRef, name: &str) -> Option<u64> {
        number_u64(self.value(dict, name)?)
    }

    pub(crate) fn f64(&self, dict: CFDictionaryRef, name: &str) -> Option<f64> {
        number_value(self.value(dict, name)?, K_CF_NUMBER_FLOAT64_TYPE, 0f64)
    }

    pub(crate) fn flag(&self, dict: CFDictionaryRef, name: &str) -> Option<bool> {
        self.value(dict, name).map(|v| unsafe { CFBooleanGetValue(v) })
    }

    pub(crate) fn string(&self, dict: CFDictionaryRef, name: &str) -> Option<String> {
        string_value(self.value(dict, name)?)
    }

    pub(crate) fn rect(&self, dict: CFDictionaryRef, name: &str) -> Option<CGRect> {
        let value = self.value(dict, name)?;
        let mut rect = CGRect::default();
        unsafe { CGRectMakeWithDictionaryRepresentation(value, &mut rect) }.then_some(rect)
    }
}

fn number_value<T>(number: CFTypeRef, the_type: isize, mut out: T) -> Option<T> {
    unsafe { CFNumberGetValue(number, the_type, &mut out as *mut T as *mut c_void) }.then_some(out)
}

pub(crate) fn number_u64(number: CFTypeRef) -> Option<u64> {
    number_value(number, K_CF_NUMBER_SINT64_TYPE, 0i64).map(|v| v as u64)
}

pub(crate) fn string_value(s: CFStringRef) -> Option<String> {
    let len = unsafe { CFStringGetLength(s) };
    if len <= 0 {
        return Some(String::new());
    }
    let max_bytes = unsafe { CFStringGetMaximumSizeForEncoding(len, K_CF_STRING_ENCODING_UTF8) };
    if max_bytes <= 0 {
        return None;
    }
    let mut buf = vec![0u8; max_bytes as usize + 1];
    if !unsafe { CFStringGetCString(s, buf.as_mut_ptr(), buf.len() as isize, K_CF_STRING_ENCODING_UTF8) } {
        return None;
    }
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf.truncate(end);
    String::from_utf8(buf).ok()
}
