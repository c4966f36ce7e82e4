//! GPU compute backend using wgpu.

use std::sync::mpsc::{self, TryRecvError};

use tracing::{debug, error, info};
use wgpu::util::DeviceExt;

use super::kernel::{KERNEL_ENTRY_POINT, KernelSource};
use crate::core::{ComputeBackend, IntegrationError, KernelJob, Tally};

/// Must match `@workgroup_size` in the kernel.
const WORKGROUP_SIZE: u32 = 64;

/// Workgroups launched per dispatch unless the adapter allows fewer.
const DEFAULT_WORKGROUPS: u32 = 64;

/// Uniform block matching the WGSL `Params` struct layout.
#[repr(C)]
#[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GpuParams {
    a: i32,
    b: i32,
    c: i32,
    xmin: i32,
    xmax: i32,
    ymin: i32,
    ymax: i32,
    seed_lo: u32,
    seed_hi: u32,
    pad: [u32; 3],
}

/// Adapter, device and compiled kernel. Dropping the backend releases them.
pub struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    name: String,
    workers: usize,
    max_workers: usize,
}

impl std::fmt::Debug for GpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuBackend")
            .field("name", &self.name)
            .field("workers", &self.workers)
            .finish_non_exhaustive()
    }
}

impl GpuBackend {
    /// Finds a high-performance adapter and builds `kernel` on it.
    ///
    /// Fails with `BackendUnavailable` when no adapter or device can be
    /// acquired and with `KernelBuildFailure` when the kernel does not
    /// validate.
    pub fn discover(kernel: &KernelSource) -> Result<Self, IntegrationError> {
        pollster::block_on(Self::discover_async(kernel))
    }

    pub async fn discover_async(kernel: &KernelSource) -> Result<Self, IntegrationError> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| IntegrationError::BackendUnavailable("no GPU adapter found".into()))?;

        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("matecarlo"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults(),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
            .map_err(|e| {
                IntegrationError::BackendUnavailable(format!("failed to create GPU device: {e}"))
            })?;

        device.on_uncaptured_error(Box::new(|e: wgpu::Error| {
            error!("uncaptured GPU error: {e}");
        }));

        let max_workgroups = device.limits().max_compute_workgroups_per_dimension;
        let workers = (WORKGROUP_SIZE * DEFAULT_WORKGROUPS.min(max_workgroups)) as usize;
        let max_workers = WORKGROUP_SIZE as usize * max_workgroups as usize;
        let name = format!("{} ({:?})", adapter_info.name, adapter_info.backend);
        info!(device = %name, workers, "GPU adapter acquired");

        let (pipeline, bind_group_layout) = build_program(&device, kernel).await?;
        debug!(kernel = kernel.label(), "kernel built");

        Ok(Self {
            device,
            queue,
            pipeline,
            bind_group_layout,
            name,
            workers,
            max_workers,
        })
    }

    /// Overrides the worker count reported to the integrator.
    ///
    /// Fails with `InvalidArgument` outside `1..=max_workers()`.
    pub fn with_workers(mut self, workers: usize) -> Result<Self, IntegrationError> {
        if workers == 0 || workers > self.max_workers {
            return Err(IntegrationError::InvalidArgument(format!(
                "GPU worker count must be in 1..={}, got {workers}",
                self.max_workers
            )));
        }
        self.workers = workers;
        Ok(self)
    }

    /// Largest worker count one dispatch can launch on this device.
    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn read_back(
        &self,
        staging: &wgpu::Buffer,
        job: &KernelJob<'_>,
    ) -> Result<Vec<Tally>, IntegrationError> {
        let slice = staging.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });

        let mapped = match &job.deadline {
            None => {
                let _ = self.device.poll(wgpu::Maintain::Wait);
                receiver
                    .recv()
                    .map_err(|e| IntegrationError::Dispatch(format!("GPU readback failed: {e}")))?
            }
            Some(deadline) => loop {
                let _ = self.device.poll(wgpu::Maintain::Poll);
                match receiver.try_recv() {
                    Ok(result) => break result,
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        return Err(IntegrationError::Dispatch(
                            "GPU readback channel closed".into(),
                        ));
                    }
                }
                deadline.check()?;
                std::thread::yield_now();
            },
        };
        mapped.map_err(|e| IntegrationError::Dispatch(format!("GPU buffer map failed: {e}")))?;

        let data = slice.get_mapped_range();
        let raw: &[[i32; 2]] = bytemuck::cast_slice(&data);
        let tallies = raw
            .iter()
            .map(|&[net, hits]| Tally {
                signed: net as i64,
                hits: hits as u64,
            })
            .collect();
        drop(data);
        staging.unmap();
        Ok(tallies)
    }
}

/// Compiles the kernel and creates its pipeline, capturing validation errors
/// instead of letting wgpu panic on them.
async fn build_program(
    device: &wgpu::Device,
    kernel: &KernelSource,
) -> Result<(wgpu::ComputePipeline, wgpu::BindGroupLayout), IntegrationError> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kernel.label()),
        source: wgpu::ShaderSource::Wgsl(kernel.text().into()),
    });

    let storage = |binding, read_only| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    };
    let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("matecarlo bind group layout"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            storage(1, true),
            storage(2, false),
        ],
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("matecarlo pipeline layout"),
        bind_group_layouts: &[&bind_group_layout],
        push_constant_ranges: &[],
    });

    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some("matecarlo pipeline"),
        layout: Some(&pipeline_layout),
        module: &module,
        entry_point: Some(KERNEL_ENTRY_POINT),
        compilation_options: Default::default(),
        cache: None,
    });

    if let Some(err) = device.pop_error_scope().await {
        let info = module.get_compilation_info().await;
        let mut log = info
            .messages
            .iter()
            .map(|m| match &m.location {
                Some(loc) => format!(
                    "{}:{}:{}: {:?}: {}",
                    kernel.label(),
                    loc.line_number,
                    loc.line_position,
                    m.message_type,
                    m.message
                ),
                None => format!("{}: {:?}: {}", kernel.label(), m.message_type, m.message),
            })
            .collect::<Vec<_>>()
            .join("\n");
        if log.is_empty() {
            log = err.to_string();
        }
        return Err(IntegrationError::KernelBuildFailure { log });
    }

    Ok((pipeline, bind_group_layout))
}

impl ComputeBackend for GpuBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn compute_units(&self) -> usize {
        self.workers
    }

    fn dispatch(&self, job: &KernelJob<'_>) -> Result<Vec<Tally>, IntegrationError> {
        let workers = job.shares.len();
        if workers == 0 || workers > self.max_workers {
            return Err(IntegrationError::InvalidArgument(format!(
                "GPU dispatch needs 1..={} workers, got {workers}",
                self.max_workers
            )));
        }
        let shares = job
            .shares
            .iter()
            .map(|&share| {
                i32::try_from(share).map(|s| s as u32).map_err(|_| {
                    IntegrationError::InvalidArgument(format!(
                        "per-worker share {share} exceeds the kernel's 32-bit counters; \
                         use more workers"
                    ))
                })
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let d = &job.problem.domain;
        let cubic = &job.problem.cubic;
        let params = GpuParams {
            a: cubic.a,
            b: cubic.b,
            c: cubic.c,
            xmin: d.xmin,
            xmax: d.xmax,
            ymin: d.ymin,
            ymax: d.ymax,
            seed_lo: job.seed as u32,
            seed_hi: (job.seed >> 32) as u32,
            pad: [0; 3],
        };

        let param_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let share_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("shares"),
                contents: bytemuck::cast_slice(&shares),
                usage: wgpu::BufferUsages::STORAGE,
            });

        let tally_size = (workers * std::mem::size_of::<[i32; 2]>()) as u64;
        let tally_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("tallies"),
            size: tally_size,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let staging_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("staging"),
            size: tally_size,
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("matecarlo bind group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: param_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: share_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: tally_buffer.as_entire_binding(),
                },
            ],
        });

        let num_workgroups = (workers as u32).div_ceil(WORKGROUP_SIZE);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("matecarlo encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("matecarlo pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(num_workgroups, 1, 1);
        }
        encoder.copy_buffer_to_buffer(&tally_buffer, 0, &staging_buffer, 0, tally_size);
        self.queue.submit(std::iter::once(encoder.finish()));
        debug!(workers, num_workgroups, "kernel submitted");

        self.read_back(&staging_buffer, job)
    }
}
