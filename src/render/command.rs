use std::{ffi::OsString, path::Path};

use super::{OutputFormat, RenderRequest, Theme};

/// Stylesheet override shipped alongside the dark theme: Mermaid's dark
/// palette leaves edge strokes and arrowheads near-black, which is unreadable
/// on a dark canvas. Written verbatim, UTF-8, to a scratch `.css` file.
pub(crate) const DARK_THEME_CSS: &str = ".edgePath path {\n  stroke: #fff !important;\n  stroke-width: 3px !important;\n}\n.marker {\n  stroke: #fff !important;\n  fill: #fff !important;\n}\n";

/// Compose the Mermaid CLI argument list for one request.
///
/// Deterministic and side-effect free: flag presence depends only on the
/// request. `style_path` is the dark-theme stylesheet and is only referenced
/// when the request's theme is dark.
pub(crate) fn build_args(
    request: &RenderRequest,
    source_path: &Path,
    style_path: Option<&Path>,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-i".into(),
        source_path.as_os_str().to_owned(),
        "-o".into(),
        request.output.as_os_str().to_owned(),
    ];

    if request.format == OutputFormat::Png {
        args.push("-s".into());
        args.push(request.scale.to_string().into());
    }

    if request.theme != Theme::Default {
        args.push("-t".into());
        args.push(request.theme.as_str().into());
    }

    if let (Theme::Dark, Some(style)) = (request.theme, style_path) {
        args.push("--cssFile".into());
        args.push(style.as_os_str().to_owned());
    }

    // Background rules: PNG always gets an explicit fill, SVG only when
    // transparency is requested, PDF never carries a background flag.
    match request.format {
        OutputFormat::Png | OutputFormat::Svg if request.transparent => {
            args.push("-b".into());
            args.push("transparent".into());
        }
        OutputFormat::Png => {
            args.push("-b".into());
            args.push("white".into());
        }
        OutputFormat::Svg | OutputFormat::Pdf => {}
    }

    args
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn request(format: OutputFormat, theme: Theme, transparent: bool) -> RenderRequest {
        RenderRequest {
            source: "graph LR\nA-->B".to_string(),
            output: PathBuf::from("/tmp/out.img"),
            format,
            scale: 2,
            theme,
            transparent,
        }
    }

    fn args_for(format: OutputFormat, theme: Theme, transparent: bool) -> Vec<OsString> {
        let style = PathBuf::from("/scratch/dark.css");
        build_args(
            &request(format, theme, transparent),
            Path::new("/scratch/input.mmd"),
            Some(&style),
        )
    }

    fn has_flag(args: &[OsString], flag: &str) -> bool {
        args.iter().any(|arg| arg == flag)
    }

    fn flag_value<'a>(args: &'a [OsString], flag: &str) -> Option<&'a OsString> {
        args.iter()
            .position(|arg| arg == flag)
            .and_then(|idx| args.get(idx + 1))
    }

    #[test]
    fn png_default_theme_gets_scale_and_white_background() {
        let args = args_for(OutputFormat::Png, Theme::Default, false);

        assert_eq!(flag_value(&args, "-i").unwrap(), "/scratch/input.mmd");
        assert_eq!(flag_value(&args, "-o").unwrap(), "/tmp/out.img");
        assert_eq!(flag_value(&args, "-s").unwrap(), "2");
        assert_eq!(flag_value(&args, "-b").unwrap(), "white");
        assert!(!has_flag(&args, "-t"));
        assert!(!has_flag(&args, "--cssFile"));
    }

    #[test]
    fn transparent_dark_svg_gets_theme_style_and_background() {
        let args = args_for(OutputFormat::Svg, Theme::Dark, true);

        assert_eq!(flag_value(&args, "-t").unwrap(), "dark");
        assert_eq!(flag_value(&args, "--cssFile").unwrap(), "/scratch/dark.css");
        assert_eq!(flag_value(&args, "-b").unwrap(), "transparent");
        assert!(!has_flag(&args, "-s"));
    }

    #[test]
    fn pdf_ignores_scale_and_background() {
        let args = args_for(OutputFormat::Pdf, Theme::Default, true);

        assert!(!has_flag(&args, "-s"));
        assert!(!has_flag(&args, "-b"));
    }

    #[test]
    fn svg_without_transparency_gets_no_background_flag() {
        let args = args_for(OutputFormat::Svg, Theme::Default, false);
        assert!(!has_flag(&args, "-b"));
    }

    #[test]
    fn forest_theme_sets_flag_without_style_file() {
        let args = args_for(OutputFormat::Png, Theme::Forest, false);

        assert_eq!(flag_value(&args, "-t").unwrap(), "forest");
        assert!(!has_flag(&args, "--cssFile"));
    }

    #[test]
    fn flag_presence_matrix_holds_for_all_combinations() {
        let formats = [OutputFormat::Png, OutputFormat::Svg, OutputFormat::Pdf];
        let themes = [Theme::Default, Theme::Dark, Theme::Forest];

        for format in formats {
            for theme in themes {
                for transparent in [false, true] {
                    let args = args_for(format, theme, transparent);

                    assert_eq!(
                        has_flag(&args, "-s"),
                        format == OutputFormat::Png,
                        "scale flag mismatch for {format:?}/{theme:?}/{transparent}"
                    );
                    assert_eq!(
                        has_flag(&args, "--cssFile"),
                        theme == Theme::Dark,
                        "style flag mismatch for {format:?}/{theme:?}/{transparent}"
                    );
                    let expect_background = match format {
                        OutputFormat::Png => true,
                        OutputFormat::Svg => transparent,
                        OutputFormat::Pdf => false,
                    };
                    assert_eq!(
                        has_flag(&args, "-b"),
                        expect_background,
                        "background flag mismatch for {format:?}/{theme:?}/{transparent}"
                    );
                }
            }
        }
    }

    #[test]
    fn building_twice_yields_identical_argument_lists() {
        let req = request(OutputFormat::Png, Theme::Dark, true);
        let style = PathBuf::from("/scratch/dark.css");

        let first = build_args(&req, Path::new("/scratch/input.mmd"), Some(&style));
        let second = build_args(&req, Path::new("/scratch/input.mmd"), Some(&style));

        assert_eq!(first, second);
    }
}
