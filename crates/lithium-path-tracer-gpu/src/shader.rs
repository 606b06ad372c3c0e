use lithium_path_tracer::Kernel;
use lithium_wgpu::include_shader_src;

const LANE_SRC: &str = include_shader_src!("lane.wgsl");
const RANDOM_SRC: &str = include_shader_src!("random.wgsl");
const SAMPLING_SRC: &str = include_shader_src!("sampling.wgsl");

const SPAWN_SRC: &str = include_shader_src!("spawn.wgsl");
const TRACE_SRC: &str = include_shader_src!("trace.wgsl");
const ACCUMULATE_SRC: &str = include_shader_src!("accumulate.wgsl");

/// Full WGSL module for `kernel` with its workgroup size fixed to `group_width`.
pub fn kernel_source(kernel: Kernel, group_width: u32) -> String {
    let (body, dependencies): (&str, &[&str]) = match kernel {
        Kernel::Spawn => (SPAWN_SRC, &[RANDOM_SRC, SAMPLING_SRC]),
        Kernel::Trace => (TRACE_SRC, &[RANDOM_SRC, SAMPLING_SRC]),
        Kernel::Accumulate => (ACCUMULATE_SRC, &[]),
    };

    let mut src = format!("const GROUP_WIDTH: u32 = {}u;\n\n", group_width);
    src.push_str(LANE_SRC);
    for dependency in dependencies {
        src.push('\n');
        src.push_str(dependency);
    }
    src.push('\n');
    src.push_str(body);
    src
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepends_the_group_width() {
        let src = kernel_source(Kernel::Trace, 32);
        assert!(src.starts_with("const GROUP_WIDTH: u32 = 32u;"));
        assert!(src.contains("fn pcg_hash"));
        assert!(src.contains("@workgroup_size(GROUP_WIDTH)"));
    }

    #[test]
    fn accumulate_needs_no_random_numbers() {
        let src = kernel_source(Kernel::Accumulate, 64);
        assert!(!src.contains("fn pcg_hash"));
        assert!(src.contains("struct LaneRecord"));
    }
}
