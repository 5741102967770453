//! Image upload commands.

use super::Context;
use crate::output::{self, OutputFormat};
use anyhow::{Context as _, Result};
use desk_api::mime_from_extension;
use std::path::Path;

/// Upload an image file.
pub async fn upload_image(ctx: &Context, path: &Path) -> Result<()> {
    let display = path.display().to_string();
    let Some(mime_type) = mime_from_extension(&display) else {
        output::print_error(
            &format!("{} is not a supported image (jpg, png, gif, webp)", display),
            &ctx.format,
        );
        return Ok(());
    };
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", display))?;

    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.uploads.upload_image(&file_name, bytes, mime_type).await {
        Ok(uploaded) => match ctx.format {
            OutputFormat::Text => {
                println!("Image uploaded");
                output::print_divider();
                output::print_row("ID", &uploaded.image_id.to_string());
                output::print_row("URL", &desk.client.uploads.image_url(&uploaded.image_url));
                output::print_row("Size", &format!("{} bytes", uploaded.file_size));
                output::print_row("Type", output::or_dash(Some(uploaded.mime_type.as_str())));
            }
            OutputFormat::Json => output::print_json(&uploaded),
        },
        Err(e) => ctx.report(&e),
    }

    Ok(())
}

/// Delete an uploaded image.
pub async fn upload_delete(ctx: &Context, image_id: i64) -> Result<()> {
    let Some(desk) = ctx.connect_logged_in().await? else {
        return Ok(());
    };

    match desk.client.uploads.delete_image(image_id).await {
        Ok(()) => output::print_success(&format!("Image {} deleted", image_id), &ctx.format),
        Err(e) => ctx.report(&e),
    }

    Ok(())
}
