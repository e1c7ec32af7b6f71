pub mod settings;

pub use settings::{
    generate_default_config, EnergySettings, ServerSettings, Settings, StoreSettings, TwinSettings,
};
