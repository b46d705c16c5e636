use crate::gfx::registry::LinkedProgram;
use crate::gfx::VertexLayout;

pub(crate) fn vertex_format(dims: u32) -> Option<wgpu::VertexFormat> {
    match dims {
        1 => Some(wgpu::VertexFormat::Float32),
        2 => Some(wgpu::VertexFormat::Float32x2),
        3 => Some(wgpu::VertexFormat::Float32x3),
        4 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// Builds the render pipeline for a linked program drawn from `layout` into
/// a single `format` color target.
pub(crate) fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    linked: &LinkedProgram<wgpu::ShaderModule>,
    layout: Option<&VertexLayout>,
) -> wgpu::RenderPipeline {
    let attributes: Vec<wgpu::VertexAttribute> = layout
        .and_then(|l| {
            vertex_format(l.dims).map(|format| wgpu::VertexAttribute {
                format,
                offset: 0,
                shader_location: l.attribute,
            })
        })
        .into_iter()
        .collect();

    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = layout
        .filter(|_| !attributes.is_empty())
        .map(|l| wgpu::VertexBufferLayout {
            array_stride: l.stride(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &attributes,
        })
        .into_iter()
        .collect();

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("prism program layout"),
        bind_group_layouts: &[],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("prism program pipeline"),
        layout: Some(&pipeline_layout),

        vertex: wgpu::VertexState {
            module: &linked.vertex.backend,
            entry_point: Some(&linked.vertex.interface.entry_point),
            compilation_options: Default::default(),
            buffers: &buffers,
        },

        fragment: Some(wgpu::FragmentState {
            module: &linked.fragment.backend,
            entry_point: Some(&linked.fragment.interface.entry_point),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}
