//! GPU grading backend via wgpu.
//!
//! The device, queue, and compute pipeline are created once per process and
//! reused for every dispatch: the shader is compiled a single time and
//! repeated grades only pay for buffer traffic.

use super::GradeBackend;
use crate::grade::GradeParams;
use crate::shaders;
use crate::{ComputeError, ComputeResult};
use bytemuck::{Pod, Zeroable};
use gview_core::{EnhanceSettings, PixelBuffer};
use gview_lut::Lut3d;
use std::sync::OnceLock;
use tracing::debug;
use wgpu::util::DeviceExt;

/// Uniform block for the grade kernel. Layout matches the WGSL `Params`
/// struct (32 bytes).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct GradeUniforms {
    pixel_count: u32,
    lut_size: u32,
    grayscale: f32,
    use_lut: u32,
    contrast: f32,
    gamma: f32,
    strength: f32,
    _pad: u32,
}

/// Process-wide GPU context: device, queue, and the compiled grade pipeline.
struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

static CONTEXT: OnceLock<Option<GpuContext>> = OnceLock::new();

fn context() -> Option<&'static GpuContext> {
    CONTEXT
        .get_or_init(|| match init_context() {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                debug!(error = %e, "wgpu backend unavailable");
                None
            }
        })
        .as_ref()
}

fn init_context() -> ComputeResult<GpuContext> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .ok_or(ComputeError::NoAdapter)?;

    let (device, queue) = pollster::block_on(
        adapter.request_device(&wgpu::DeviceDescriptor::default(), None),
    )
    .map_err(|e| ComputeError::DeviceCreation(e.to_string()))?;

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("grade_shader"),
        source: wgpu::ShaderSource::Wgsl(shaders::GRADE.into()),
    });

    let storage_read = wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Storage { read_only: true },
        has_dynamic_offset: false,
        min_binding_size: None,
    };
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("grade_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: storage_read,
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Storage { read_only: false },
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 3,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: storage_read,
                count: None,
            },
        ],
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("grade_pl"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("grade_pipeline"),
        layout: Some(&layout),
        module: &shader,
        entry_point: Some("main"),
        compilation_options: Default::default(),
        cache: None,
    });

    debug!(adapter = %adapter.get_info().name, "wgpu grade pipeline compiled");

    Ok(GpuContext {
        device,
        queue,
        pipeline,
        bind_group_layout,
    })
}

/// wgpu backend.
#[derive(Debug, Default)]
pub struct WgpuBackend;

impl WgpuBackend {
    /// Creates a new wgpu backend handle.
    pub fn new() -> Self {
        Self
    }

    /// Whether a usable adapter exists. The probe runs once per process.
    pub fn is_available() -> bool {
        context().is_some()
    }
}

impl GradeBackend for WgpuBackend {
    fn grade(
        &self,
        img: &PixelBuffer,
        settings: &EnhanceSettings,
        lut: Option<&Lut3d>,
    ) -> ComputeResult<PixelBuffer> {
        let ctx = context().ok_or(ComputeError::NoAdapter)?;
        let device = &ctx.device;
        let queue = &ctx.queue;

        let pixel_count = img.pixel_count();
        let params = GradeParams::from(settings);
        let uniforms = GradeUniforms {
            pixel_count: pixel_count as u32,
            lut_size: lut.map(|l| l.size() as u32).unwrap_or(0),
            grayscale: params.grayscale,
            use_lut: u32::from(lut.is_some() && params.lut_strength > 0.0),
            contrast: params.contrast,
            gamma: params.gamma,
            strength: params.lut_strength,
            _pad: 0,
        };

        let src_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grade_src"),
            contents: bytemuck::cast_slice(img.data()),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let byte_len = (img.data().len() * 4) as u64;
        let dst_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grade_dst"),
            size: byte_len,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let params_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grade_params"),
            contents: bytemuck::bytes_of(&uniforms),
            usage: wgpu::BufferUsages::UNIFORM,
        });

        // The LUT binding must always be present; bind a single dummy
        // triple when no LUT is selected.
        let dummy = [0.0f32; 3];
        let lut_slice: &[f32] = lut.map(|l| l.data()).unwrap_or(&dummy);
        let lut_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("grade_lut"),
            contents: bytemuck::cast_slice(lut_slice),
            usage: wgpu::BufferUsages::STORAGE,
        });

        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("grade_staging"),
            size: byte_len,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("grade_bg"),
            layout: &ctx.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: src_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: dst_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: lut_buf.as_entire_binding(),
                },
            ],
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("grade_encoder"),
        });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("grade_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&ctx.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups((pixel_count as u32).div_ceil(256), 1, 1);
        }
        encoder.copy_buffer_to_buffer(&dst_buf, 0, &staging, 0, byte_len);
        queue.submit(std::iter::once(encoder.finish()));

        // Readback
        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(ComputeError::OperationFailed(format!(
                    "readback map failed: {e:?}"
                )));
            }
            Err(e) => {
                return Err(ComputeError::OperationFailed(format!(
                    "readback channel closed: {e}"
                )));
            }
        }

        let mapped = slice.get_mapped_range();
        let out: Vec<f32> = bytemuck::cast_slice(&mapped).to_vec();
        drop(mapped);
        staging.unmap();

        Ok(PixelBuffer::from_vec(out, img.width, img.height)?)
    }

    fn name(&self) -> &'static str {
        "wgpu"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::CpuBackend;

    // Needs a real adapter; run with `cargo test -F wgpu -- --ignored`.
    #[test]
    #[ignore]
    fn test_gpu_matches_cpu_within_one_level() {
        if !WgpuBackend::is_available() {
            return;
        }
        let mut img = PixelBuffer::new(64, 64);
        for y in 0..64 {
            for x in 0..64 {
                let v = (x + y * 64) as f32 / 4095.0;
                img.set_pixel(x, y, [v, 1.0 - v, v * 0.5]);
            }
        }
        let lut = Lut3d::identity(16);
        let settings = EnhanceSettings::default()
            .with_contrast(1.3)
            .with_gamma(2.2)
            .with_lut("ident")
            .with_lut_strength(0.8);

        let cpu = CpuBackend::new().grade(&img, &settings, Some(&lut)).unwrap();
        let gpu = WgpuBackend::new().grade(&img, &settings, Some(&lut)).unwrap();

        for (a, b) in cpu.data().iter().zip(gpu.data()) {
            assert!((a - b).abs() <= 1.0 / 255.0, "cpu={a} gpu={b}");
        }
    }
}
