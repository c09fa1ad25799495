use std::{
    ffi::c_void,
    fs::{File, OpenOptions},
    num::NonZeroUsize,
    os::fd::AsRawFd,
    path::Path,
    ptr::NonNull,
};

use log::{info, warn};
use nix::{
    errno::Errno,
    sys::mman::{mmap, munmap, MapFlags, ProtFlags},
};
use num_format::{Locale, ToFormattedString};

use crate::{
    graphics::{Error, Result},
    surface::{Geometry, Surface},
};

const FBIOGET_VSCREENINFO: u16 = 0x4600;
const FBIOGET_FSCREENINFO: u16 = 0x4602;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct Bitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

/// `struct fb_var_screeninfo` from `<linux/fb.h>`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct VarScreenInfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    pub transp: Bitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

/// `struct fb_fix_screeninfo` from `<linux/fb.h>`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct FixScreenInfo {
    pub id: [u8; 16],
    pub smem_start: usize,
    pub smem_len: u32,
    pub kind: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    pub line_length: u32,
    pub mmio_start: usize,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

nix::ioctl_read_bad!(get_var_screen_info, FBIOGET_VSCREENINFO, VarScreenInfo);
nix::ioctl_read_bad!(get_fix_screen_info, FBIOGET_FSCREENINFO, FixScreenInfo);

/// A shared read-write mapping of device memory, unmapped on drop.
pub struct MappedMemory {
    address: NonNull<c_void>,
    length: usize,
}

impl MappedMemory {
    fn map(file: &File, length: usize) -> Result<Self> {
        let non_zero_length = NonZeroUsize::new(length).ok_or(Error::Map(Errno::EINVAL))?;
        let address = unsafe {
            mmap(
                None,
                non_zero_length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )
        }
        .map_err(Error::Map)?;
        Ok(Self { address, length })
    }
}

impl AsRef<[u8]> for MappedMemory {
    fn as_ref(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.address.as_ptr() as *const u8, self.length) }
    }
}

impl AsMut<[u8]> for MappedMemory {
    fn as_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.address.as_ptr() as *mut u8, self.length) }
    }
}

impl Drop for MappedMemory {
    fn drop(&mut self) {
        if let Err(error) = unsafe { munmap(self.address, self.length) } {
            warn!("Failed to unmap framebuffer: {}", error);
        }
    }
}

/// An open framebuffer device together with its mapped video memory.
///
/// The mapping is declared before the file so it is released first.
pub struct Framebuffer {
    surface: Surface<MappedMemory>,
    _device: File,
}

impl Framebuffer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let device = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|error| Error::Open(path.to_path_buf(), error))?;

        let mut var_info = VarScreenInfo::default();
        let mut fix_info = FixScreenInfo::default();
        unsafe {
            get_var_screen_info(device.as_raw_fd(), &mut var_info).map_err(Error::Query)?;
            get_fix_screen_info(device.as_raw_fd(), &mut fix_info).map_err(Error::Query)?;
        }

        let geometry = geometry_from(&var_info, &fix_info)?;
        let length = mapping_length(&var_info, &fix_info);
        let memory = MappedMemory::map(&device, length)?;
        info!(
            "Mapped {} ({}x{}, {} bpp, stride {}): {} bytes",
            path.display(),
            geometry.width,
            geometry.height,
            var_info.bits_per_pixel,
            geometry.stride,
            length.to_formatted_string(&Locale::en)
        );

        Ok(Self {
            surface: Surface::new(memory, geometry).map_err(Error::Layout)?,
            _device: device,
        })
    }

    pub fn surface(&self) -> &Surface<MappedMemory> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface<MappedMemory> {
        &mut self.surface
    }
}

fn geometry_from(var_info: &VarScreenInfo, fix_info: &FixScreenInfo) -> Result<Geometry> {
    let bytes_per_pixel = match var_info.bits_per_pixel {
        16 => 2,
        32 => 4,
        other => return Err(Error::UnsupportedDepth(other)),
    };
    Ok(Geometry {
        width: var_info.xres as usize,
        height: var_info.yres as usize,
        stride: fix_info.line_length as usize,
        bytes_per_pixel,
    })
}

fn mapping_length(var_info: &VarScreenInfo, fix_info: &FixScreenInfo) -> usize {
    let length = fix_info.line_length as usize * var_info.yres_virtual as usize;
    match fix_info.smem_len as usize {
        0 => length,
        smem_len => length.min(smem_len),
    }
}
