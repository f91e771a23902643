//! Workspace-level integration tests for model-audit live under `tests/`.
