#![no_main]

use libfuzzer_sys::fuzz_target;
use lieutenant::prefs::Preferences;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Arbitrary file contents load or fail cleanly, and whatever loads can
    // be saved and loaded again
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();

    let Ok(prefs) = Preferences::load(file.path()) else {
        return;
    };
    let saved = prefs.to_json_pretty().unwrap();

    let mut again = tempfile::NamedTempFile::new().unwrap();
    again.write_all(saved.as_bytes()).unwrap();
    let reloaded = Preferences::load(again.path()).unwrap();
    assert_eq!(reloaded.cmds, prefs.cmds);
    assert_eq!(reloaded.aliases, prefs.aliases);
    // Numbers may be re-read with a last-digit difference, so only keys here
    assert!(reloaded.settings.keys().eq(prefs.settings.keys()));
});
