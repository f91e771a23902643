//! Test fixtures
//!
//! Canned upstream responses mounted on the mock servers.

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MODEL_ID: &str = "acme/tiny-bert";
pub const MODEL_URL: &str = "https://huggingface.co/acme/tiny-bert";
pub const CODE_URL: &str = "https://github.com/acme/tiny-bert-code";
pub const DATASET_URL: &str = "https://huggingface.co/datasets/acme/corpus";

/// A well documented model card
pub fn rich_readme() -> String {
    format!(
        "# tiny-bert\n\n\
         A compact encoder trained on {DATASET_URL} with the training code at {CODE_URL}.\n\n\
         ## Usage\n\n```python\nfrom transformers import AutoModel\nmodel = AutoModel.from_pretrained(\"{MODEL_ID}\")\n```\n\n\
         ```bash\npip install transformers\n```\n\n\
         ```python\nmodel.eval()\n```\n\n\
         ## Evaluation\n\n| Task | Accuracy |\n|------|----------|\n| SST-2 | 91.2% |\n| MNLI | 84.6 F1 |\n\n\
         ## License\n\nApache-2.0\n\n{}",
        "More details. ".repeat(400)
    )
}

/// Model info with one safetensors file of `weight_bytes`
pub fn model_info(weight_bytes: u64, likes: u64) -> Value {
    json!({
        "id": MODEL_ID,
        "likes": likes,
        "downloads": 1200,
        "tags": ["license:apache-2.0"],
        "siblings": [
            {"rfilename": "config.json", "size": 600},
            {"rfilename": "model.safetensors", "size": 135, "lfs": {"size": weight_bytes}},
            {"rfilename": "examples/classify.ipynb", "size": 2048}
        ],
        "createdAt": "2023-01-10T00:00:00.000Z",
        "lastModified": "2024-05-01T00:00:00.000Z"
    })
}

pub fn dataset_info() -> Value {
    json!({
        "id": "acme/corpus",
        "description": "Sentences from public-domain books",
        "citation": "@misc{corpus}",
        "likes": 40,
        "downloads": 9000,
        "tags": ["license:cc-by-4.0", "language:en"],
        "lastModified": "2024-04-01T00:00:00.000Z"
    })
}

pub fn code_repo() -> Value {
    json!({
        "full_name": "acme/tiny-bert-code",
        "default_branch": "main",
        "stargazers_count": 120,
        "forks_count": 10,
        "watchers_count": 120,
        "subscribers_count": 5,
        "pushed_at": "2024-05-20T00:00:00Z",
        "license": {"spdx_id": "Apache-2.0", "name": "Apache License 2.0"}
    })
}

/// Commits by `logins`, all dated in May 2024
pub fn commits(logins: &[&str]) -> Value {
    Value::Array(
        logins
            .iter()
            .map(|login| {
                json!({
                    "author": {"login": login},
                    "commit": {"author": {"name": login, "date": "2024-05-15T00:00:00Z"}}
                })
            })
            .collect(),
    )
}

pub async fn mount_json(server: &MockServer, at: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_text(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Hub model with the given card and info
pub async fn mount_hub_model(server: &MockServer, info: Value, readme: &str) {
    mount_json(server, &format!("/api/models/{}", MODEL_ID), info).await;
    mount_text(server, &format!("/{}/raw/main/README.md", MODEL_ID), readme).await;
}

/// Linked code repository and dataset referenced by [`rich_readme`]
pub async fn mount_linked(hub: &MockServer, github: &MockServer, logins: &[&str]) {
    mount_json(hub, "/api/datasets/acme/corpus", dataset_info()).await;
    mount_json(github, "/repos/acme/tiny-bert-code", code_repo()).await;
    mount_text(
        github,
        "/repos/acme/tiny-bert-code/readme",
        "# Training code\n\nReproduces tiny-bert.\n\n```bash\npython train.py\n```\n",
    )
    .await;
    mount_json(github, "/repos/acme/tiny-bert-code/commits", commits(logins)).await;
}

/// LLM that answers every classification with the top bucket
pub async fn mount_confident_llm(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"score\": 1.0, \"confidence\": 0.9}"}}]
        })))
        .mount(server)
        .await;
}
