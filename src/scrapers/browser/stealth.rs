//! Stealth evasion JavaScript.
//! Based on puppeteer-extra-plugin-stealth techniques.

/// Evaluated in each page once the document is ready.
pub const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Fix chrome object
    r#"
    window.chrome = window.chrome || {
        runtime: {},
        loadTimes: function() {},
        csi: function() {},
        app: {}
    };
    "#,
    // Fix plugins (make it look like regular Chrome)
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' },
            { name: 'Native Client', filename: 'internal-nacl-plugin', description: '' }
        ],
        configurable: true
    });
    "#,
    // Remove automation-related properties
    r#"
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Array;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Promise;
    delete window.cdc_adoQpoasnfa76pfcZLmcfl_Symbol;
    "#,
];

/// Registered before navigation so detection scripts never see the flag.
pub const WEBDRIVER_ON_NEW_DOCUMENT: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// `navigator.language(s)` override matching the session locale.
pub fn languages_script(locale: &str) -> String {
    let primary = locale.split(['-', '_']).next().unwrap_or(locale);
    let languages = if primary == locale || primary.is_empty() {
        format!("['{}']", locale)
    } else {
        format!("['{}', '{}']", locale, primary)
    };
    format!(
        "Object.defineProperty(navigator, 'language', {{ get: () => '{locale}', configurable: true }});\n\
         Object.defineProperty(navigator, 'languages', {{ get: () => {languages}, configurable: true }});"
    )
}
