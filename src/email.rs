use resend_rs::types::CreateEmailBaseOptions;
use resend_rs::Resend;
use tracing::error;
use uuid::Uuid;

const FROM_EMAIL: &str = "Berry <no-reply@berryopps.org>";

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Unknown Email error")]
    UnknownError,
}

/// Sends the account verification email. When no API key is configured
/// (local development) the code is logged instead so the flow stays
/// walkable end to end.
pub async fn send_verification_email(
    app_state: &crate::AppState,
    to_email: String,
    verification_code: Uuid,
) -> Result<(), EmailError> {
    tracing::debug!("Entering send_verification_email");

    let api_key = match app_state.resend_api_key {
        Some(ref key) => key.clone(),
        None => {
            tracing::info!(
                "No email API key configured; verification code for {} is {}",
                to_email,
                verification_code
            );
            return Ok(());
        }
    };

    let resend = Resend::new(&api_key);

    let base_url = app_state.frontend_url();
    let verification_url = format!(
        "{}/verify-email/{}",
        base_url.trim_end_matches('/'),
        verification_code
    );

    let html_content = format!(
        r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <meta name="viewport" content="width=device-width, initial-scale=1.0">
            <title>Verify Your Berry Account</title>
            <style>
                body {{ font-family: ui-sans-serif,system-ui,sans-serif; }}
                .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
                h1, h2, h3 {{ font-weight: 300; }}
                .button {{ display: inline-block; padding: 10px 20px; background-color: #4a7c59; color: #ffffff; text-decoration: none; border-radius: 5px; }}
            </style>
        </head>
        <body>
            <div class="container">
                <h1>Verify Your Berry Account</h1>
                <p>Thanks for signing up. Click the button below to confirm your email address:</p>
                <p><a class="button" href="{verification_url}">Verify Email</a></p>
                <p>If the button doesn't work, copy this link into your browser:</p>
                <p>{verification_url}</p>
                <p>This link expires in 24 hours. If you didn't create a Berry account, you can ignore this email.</p>
            </div>
        </body>
        </html>
        "#
    );

    let email = CreateEmailBaseOptions::new(FROM_EMAIL, [to_email], "Verify Your Berry Account")
        .with_html(&html_content);

    resend.emails.send(email).await.map_err(|e| {
        error!("Failed to send verification email: {:?}", e);
        EmailError::UnknownError
    })?;

    Ok(())
}
