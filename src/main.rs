//! # 头像 / 封面图片编辑器 — 命令行入口
//!
//! 本文件仅负责参数解析与日志初始化，编辑流程全部走 `EditorSession`，
//! 与前端交互时的调用顺序一致。

use std::path::PathBuf;

use profile_image_editor::error::AppError;
use profile_image_editor::image_editor::{
    ExportProfile,
    ImageEditor,
    MaskKind,
    PointerSample,
    read_selected_file,
};
use profile_image_editor::settings;

const USAGE: &str = "用法: profile-image-editor <input> --kind profile|cover [--zoom Z] [--pan-x X] [--pan-y Y] \
[--container-width W] [--profile quality|balanced|speed] [--settings FILE] --out FILE";

#[derive(Debug)]
struct CliArgs {
    input: PathBuf,
    kind: MaskKind,
    zoom: Option<f64>,
    pan_x: f64,
    pan_y: f64,
    container_width: Option<f64>,
    profile: Option<ExportProfile>,
    settings: Option<PathBuf>,
    out: PathBuf,
}

fn parse_number(flag: &str, value: &str) -> Result<f64, AppError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| AppError::Args(format!("{} 需要数字，实际为 {}", flag, value)))
}

fn parse_args<I>(args: I) -> Result<CliArgs, AppError>
where
    I: IntoIterator<Item = String>,
{
    let mut input = None;
    let mut kind = None;
    let mut zoom = None;
    let mut pan_x = 0.0;
    let mut pan_y = 0.0;
    let mut container_width = None;
    let mut profile = None;
    let mut settings = None;
    let mut out = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if !arg.starts_with("--") {
            if input.replace(PathBuf::from(&arg)).is_some() {
                return Err(AppError::Args(format!("多余的参数：{}", arg)));
            }
            continue;
        }

        let value = args
            .next()
            .ok_or_else(|| AppError::Args(format!("{} 缺少取值", arg)))?;

        match arg.as_str() {
            "--kind" => {
                kind = Some(MaskKind::from_str(&value).map_err(|_| {
                    AppError::Args(format!("--kind 只支持 profile / cover，实际为 {}", value))
                })?)
            }
            "--zoom" => zoom = Some(parse_number(&arg, &value)?),
            "--pan-x" => pan_x = parse_number(&arg, &value)?,
            "--pan-y" => pan_y = parse_number(&arg, &value)?,
            "--container-width" => container_width = Some(parse_number(&arg, &value)?),
            "--profile" => profile = Some(ExportProfile::from_str(&value)?),
            "--settings" => settings = Some(PathBuf::from(value)),
            "--out" => out = Some(PathBuf::from(value)),
            other => return Err(AppError::Args(format!("未知参数：{}", other))),
        }
    }

    Ok(CliArgs {
        input: input.ok_or_else(|| AppError::Args("缺少输入文件".to_string()))?,
        kind: kind.ok_or_else(|| AppError::Args("缺少 --kind".to_string()))?,
        zoom,
        pan_x,
        pan_y,
        container_width,
        profile,
        settings,
        out: out.ok_or_else(|| AppError::Args("缺少 --out".to_string()))?,
    })
}

async fn run(args: CliArgs) -> Result<serde_json::Value, AppError> {
    let editor = ImageEditor::default();
    if let Some(path) = &args.settings {
        settings::apply_settings_file(&editor, path)?;
    }
    if let Some(profile) = args.profile {
        editor.set_export_profile(profile)?;
    }

    let config = editor.config_snapshot()?;
    let file = read_selected_file(&args.input, &config).await?;

    let mut session = editor.open_session(args.kind, None, |data_url| {
        log::debug!("save callback received {} chars", data_url.len());
    })?;
    if let Some(width) = args.container_width {
        session.set_container_width(width);
    }
    session.select_file(file).await?;

    if let Some(zoom) = args.zoom {
        session.set_zoom(zoom);
    }

    // 平移同样走拖拽控制器，保证与交互时一样被夹紧。
    if args.pan_x != 0.0 || args.pan_y != 0.0 {
        if let Some(transform) = session.transform() {
            let start = PointerSample {
                x: transform.position().x,
                y: transform.position().y,
            };
            session.pointer_down(&start);
            session.pointer_move(&PointerSample {
                x: args.pan_x,
                y: args.pan_y,
            });
            session.pointer_up();
        }
    }

    let transform = session
        .transform()
        .ok_or_else(|| AppError::Args("图片未载入".to_string()))?;
    let mask = session.mask();
    let exported = session.save()?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&args.out, &exported.bytes).await?;
    session.close();

    Ok(serde_json::json!({
        "kind": args.kind,
        "mask": { "width": mask.width, "height": mask.height },
        "zoom": transform.zoom(),
        "minZoom": transform.min_zoom(),
        "maxZoom": transform.max_zoom(),
        "position": transform.position(),
        "output": {
            "path": args.out.display().to_string(),
            "width": exported.width,
            "height": exported.height,
            "bytes": exported.bytes.len(),
        },
    }))
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{}\n{}", err, USAGE);
            std::process::exit(2);
        }
    };

    match run(args).await {
        Ok(summary) => println!("{}", summary),
        Err(err) => {
            log::error!("❌ 编辑失败: {}", err);
            std::process::exit(1);
        }
    }
}
