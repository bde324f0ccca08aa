#![no_main]
use libfuzzer_sys::fuzz_target;
use pourer_core::{PourParameterModel, PourerCfg};

fuzz_target!(|data: &str| {
    // Parse, validate, and build the pour table; errors are fine, panics are not.
    let Ok(cfg) = toml::from_str::<pourer_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_err() {
        return;
    }
    // Skip configs pointing at files on the fuzzing host.
    if cfg.pour.table_csv.is_some() {
        return;
    }
    let Ok(rt) = PourerCfg::try_from(&cfg) else {
        return;
    };
    if let Ok(model) = PourParameterModel::new(rt.pour.buckets) {
        for w in [i32::MIN, -1, 0, 500, 850, 1000, i32::MAX] {
            let _ = model.parameters(w);
        }
    }
});
