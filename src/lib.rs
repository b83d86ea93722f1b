pub mod animation;
pub mod config;
pub mod exec;
pub mod hardware;
pub mod input;
pub mod menu;
pub mod pin;
pub mod software;
pub mod state;
pub mod web;

use tracing::info;

use animation::AmbientAnimator;
use config::Config;
use hardware::Peripherals;
use software::{LocalLibrary, SoftwareCatalog};
use state::ModeController;

/// Main application struct
pub struct App {
    controller: ModeController,
}

impl App {
    /// Wire the controller to the configured catalog and software directory
    pub fn new(config: &Config, peripherals: Peripherals) -> Self {
        let catalog = SoftwareCatalog::http(&config.server);
        let library = LocalLibrary::new(&config.storage.software_dir);
        info!(
            "Catalog at {}, packages in {}",
            config.server.base_url,
            library.dir().display()
        );

        let controller = ModeController::new(
            config,
            peripherals,
            catalog,
            library,
            AmbientAnimator::from_entropy(),
        );
        Self { controller }
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    /// Boot, then tick until `keep_running` says stop
    pub fn run(&mut self, mut keep_running: impl FnMut() -> bool) {
        self.controller.boot();
        while keep_running() {
            self.controller.tick();
        }
        info!("Shutdown complete");
    }
}
