pub struct Lithium {}

static LITHIUM_STATIC: std::sync::OnceLock<LithiumStatic> = std::sync::OnceLock::new();

struct LithiumStatic {
    app_name: String,
}

impl LithiumStatic {
    fn init(app_name: &str) -> &'static Self {
        puffin::profile_function!();

        LITHIUM_STATIC.get_or_init(|| {
            // Another logger may already be installed by a test harness.
            let _ = env_logger::builder()
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn)
                .filter_module("naga", log::LevelFilter::Warn)
                .parse_default_env()
                .try_init();

            log::debug!("{} started", app_name);
            Self {
                app_name: app_name.to_owned(),
            }
        })
    }
}

impl Lithium {
    /// Sets up process wide state, safe to call more than once.
    pub fn new(app_name: &str) -> Self {
        LithiumStatic::init(app_name);

        Self {}
    }

    pub fn app_name(&self) -> &'static str {
        LITHIUM_STATIC
            .get()
            .map(|s| s.app_name.as_str())
            .unwrap_or_default()
    }

    /// Turns puffin scope collection on or off for the whole process.
    pub fn set_profiling(&self, enabled: bool) {
        puffin::set_scopes_on(enabled);
        if enabled {
            log::info!("Profiling scopes enabled");
        }
    }

    /// Closes the current puffin frame, a no-op while profiling is off.
    pub fn end_frame(&self) {
        puffin::GlobalProfiler::lock().new_frame();
    }
}
