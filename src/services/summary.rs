use crate::config::Config;
use crate::models::entry::{Emotion, NewItem};

/// Build the reflection-coach prompt from the entry being saved. The tone
/// branches on whether the selected emotion is in the positive set.
pub fn build_prompt(emotion: Emotion, items: &[NewItem]) -> String {
    let listed: Vec<String> = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {} — \"{}\"", i + 1, item.title, item.content.trim()))
        .collect();

    let guidance = if emotion.is_positive() {
        "The mood is positive: acknowledge where the feeling comes from (their values, \
         choices and effort) and encourage them to keep it going."
    } else {
        "The mood is a difficult one: respond with genuine empathy, help reframe the \
         feeling gently, and close with a warm, restorative note."
    };

    format!(
        "You are a reflection coach for a gratitude journal.\n\n\
         Today's gratitude items:\n{}\n\n\
         Current mood: {}\n\n\
         {}\n\n\
         Reply with exactly one warm sentence of 50 to 90 characters that sums up the day. \
         No numbering, no quotes, just the sentence.",
        listed.join("\n"),
        emotion.label(),
        guidance,
    )
}

/// First non-empty line of the model output; the stored summary is one line.
pub fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Ask the text-generation service for the one-line summary. Any failure
/// here blocks the save; persistence is never attempted with a failed
/// generation.
pub async fn generate_summary(
    config: &Config,
    emotion: Emotion,
    items: &[NewItem],
) -> Result<String, anyhow::Error> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    let prompt = build_prompt(emotion, items);

    let response = client
        .post("https://api.anthropic.com/v1/messages")
        .header("x-api-key", &config.claude_api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&serde_json::json!({
            "model": config.claude_model,
            "max_tokens": 256,
            "messages": [{
                "role": "user",
                "content": prompt
            }]
        }))
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("Summary API error {}: {}", status, body);
    }

    let payload: serde_json::Value = response.json().await?;
    let text = payload["content"][0]["text"].as_str().unwrap_or("");

    first_line(text).ok_or_else(|| anyhow::anyhow!("Summary API returned no text"))
}
