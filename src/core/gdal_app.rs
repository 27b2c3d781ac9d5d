//! Thin wrappers over the `gdal_translate` and `gdalwarp` library entry points
//!
//! The `gdal` crate does not expose these utilities, so they are driven through
//! `gdal-sys` with the same argument vectors the command line tools accept.

use crate::types::RasterError;
use gdal::Dataset;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::path::Path;
use std::ptr;

/// NULL-terminated `char**` built from owned strings
struct CArgv {
    _owned: Vec<CString>,
    ptrs: Vec<*mut c_char>,
}

impl CArgv {
    fn new(args: &[String]) -> Result<Self, RasterError> {
        let owned = args
            .iter()
            .map(|a| CString::new(a.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RasterError::WarpFailed(format!("invalid GDAL argument: {}", e)))?;
        let mut ptrs: Vec<*mut c_char> = owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();
        ptrs.push(ptr::null_mut());
        Ok(Self { _owned: owned, ptrs })
    }

    fn as_mut_ptr(&mut self) -> *mut *mut c_char {
        self.ptrs.as_mut_ptr()
    }
}

/// Last error message recorded by GDAL on this thread
pub fn last_cpl_message() -> String {
    unsafe {
        let msg = gdal_sys::CPLGetLastErrorMsg();
        if msg.is_null() {
            return String::new();
        }
        CStr::from_ptr(msg).to_string_lossy().into_owned()
    }
}

pub(crate) fn path_to_cstring(path: &Path) -> Result<CString, RasterError> {
    let s = path
        .to_str()
        .ok_or_else(|| RasterError::NonUtf8Path(path.to_path_buf()))?;
    CString::new(s).map_err(|_| RasterError::NonUtf8Path(path.to_path_buf()))
}

fn failure(tool: &str, usage_error: c_int) -> RasterError {
    let detail = last_cpl_message();
    if usage_error != 0 {
        RasterError::WarpFailed(format!("{} usage error: {}", tool, detail))
    } else if detail.is_empty() {
        RasterError::WarpFailed(format!("{} failed", tool))
    } else {
        RasterError::WarpFailed(format!("{} failed: {}", tool, detail))
    }
}

/// Run `gdal_translate` on an open dataset, returning the written dataset
pub fn translate(src: &Dataset, dest: &Path, args: &[String]) -> Result<Dataset, RasterError> {
    log::debug!("gdal_translate {} -> {}", args.join(" "), dest.display());

    let dest_c = path_to_cstring(dest)?;
    let mut argv = CArgv::new(args)?;

    unsafe {
        gdal_sys::CPLErrorReset();
        let options = gdal_sys::GDALTranslateOptionsNew(argv.as_mut_ptr(), ptr::null_mut());
        if options.is_null() {
            return Err(failure("gdal_translate", 1));
        }

        let mut usage_error: c_int = 0;
        let handle = gdal_sys::GDALTranslate(
            dest_c.as_ptr(),
            src.c_dataset(),
            options,
            &mut usage_error,
        );
        gdal_sys::GDALTranslateOptionsFree(options);

        if handle.is_null() {
            return Err(failure("gdal_translate", usage_error));
        }
        Ok(Dataset::from_c_dataset(handle))
    }
}

/// Run `gdalwarp` with a single source dataset into a new file at `dest`
pub fn warp(src: &Dataset, dest: &Path, args: &[String]) -> Result<Dataset, RasterError> {
    log::debug!("gdalwarp {} -> {}", args.join(" "), dest.display());

    let dest_c = path_to_cstring(dest)?;
    let mut argv = CArgv::new(args)?;

    unsafe {
        gdal_sys::CPLErrorReset();
        let options = gdal_sys::GDALWarpAppOptionsNew(argv.as_mut_ptr(), ptr::null_mut());
        if options.is_null() {
            return Err(failure("gdalwarp", 1));
        }

        let mut sources = [src.c_dataset()];
        let mut usage_error: c_int = 0;
        let handle = gdal_sys::GDALWarp(
            dest_c.as_ptr(),
            ptr::null_mut(),
            1,
            sources.as_mut_ptr(),
            options,
            &mut usage_error,
        );
        gdal_sys::GDALWarpAppOptionsFree(options);

        if handle.is_null() {
            return Err(failure("gdalwarp", usage_error));
        }
        Ok(Dataset::from_c_dataset(handle))
    }
}
