// Macros file - tracing macros are referenced by full path inside the definitions

/// Standardized logging macros so handlers, the generator and the store
/// emit the same field names for the same things.

// ============================================================================
// API Operation Logging Macros
// ============================================================================

/// Log the start of an API operation
#[macro_export]
macro_rules! log_api_start {
    ($operation:expr, set_id = $set_id:expr, card_id = $card_id:expr) => {
        tracing::debug!(
            operation = $operation,
            set_id = %$set_id,
            card_id = %$card_id,
            "API operation started"
        );
    };
    ($operation:expr, set_id = $set_id:expr) => {
        tracing::debug!(
            operation = $operation,
            set_id = %$set_id,
            "API operation started"
        );
    };
    ($operation:expr) => {
        tracing::debug!(
            operation = $operation,
            "API operation started"
        );
    };
}

/// Log successful completion of an API operation
#[macro_export]
macro_rules! log_api_success {
    ($operation:expr, set_id = $set_id:expr, card_id = $card_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            set_id = %$set_id,
            card_id = %$card_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, set_id = $set_id:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            set_id = %$set_id,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, count = $count:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            count = $count,
            "API operation completed: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::info!(
            operation = $operation,
            "API operation completed: {}", $msg
        );
    };
}

/// Log API operation errors with consistent structure
#[macro_export]
macro_rules! log_api_error {
    ($operation:expr, set_id = $set_id:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            set_id = %$set_id,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
    ($operation:expr, error = $error:expr, $msg:expr) => {
        tracing::error!(
            operation = $operation,
            error = %$error,
            "API operation failed: {}", $msg
        );
    };
}

/// Log API warnings with context
#[macro_export]
macro_rules! log_api_warn {
    ($operation:expr, set_id = $set_id:expr, card_id = $card_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            set_id = %$set_id,
            card_id = %$card_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, set_id = $set_id:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            set_id = %$set_id,
            "API operation warning: {}", $msg
        );
    };
    ($operation:expr, $msg:expr) => {
        tracing::warn!(
            operation = $operation,
            "API operation warning: {}", $msg
        );
    };
}

// ============================================================================
// Store Operation Logging Macros
// ============================================================================

/// Log flashcard store loads and saves
#[macro_export]
macro_rules! log_store_operation {
    (debug, $operation:expr, count = $count:expr, duration_ms = $duration:expr) => {
        tracing::debug!(
            component = "store",
            operation = $operation,
            set_count = $count,
            duration_ms = $duration,
            "Store operation completed"
        );
    };
    (info, $operation:expr, $msg:expr) => {
        tracing::info!(
            component = "store",
            operation = $operation,
            "Store operation: {}", $msg
        );
    };
    (error, $operation:expr, error = $error:expr) => {
        tracing::error!(
            component = "store",
            operation = $operation,
            error = %$error,
            "Store operation failed"
        );
    };
}

// ============================================================================
// LLM Service Logging Macros
// ============================================================================

/// Log LLM operations with provider context
#[macro_export]
macro_rules! log_llm_operation {
    (start, $operation:expr, provider = $provider:expr, card_count = $count:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            card_count = $count,
            "LLM operation started"
        );
    };
    (success, $operation:expr, provider = $provider:expr, card_count = $count:expr) => {
        tracing::info!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            card_count = $count,
            "LLM operation completed successfully"
        );
    };
    (error, $operation:expr, provider = $provider:expr, error = $error:expr, retry_count = $retry:expr) => {
        tracing::warn!(
            component = "llm_service",
            operation = $operation,
            provider = %$provider,
            error = %$error,
            retry_count = $retry,
            "LLM operation failed, falling back"
        );
    };
}

// ============================================================================
// System Event Logging Macros
// ============================================================================

/// Log system startup and configuration events
#[macro_export]
macro_rules! log_system_event {
    (startup, component = $component:expr, $msg:expr) => {
        tracing::info!(
            event_type = "startup",
            component = $component,
            "System event: {}",
            $msg
        );
    };
    (config, $msg:expr) => {
        tracing::info!(event_type = "configuration", "System event: {}", $msg);
    };
}

// ============================================================================
// Validation Logging Macros
// ============================================================================

/// Log validation results consistently
#[macro_export]
macro_rules! log_validation {
    (success, $component:expr, $msg:expr) => {
        tracing::debug!(
            event_type = "validation",
            component = $component,
            result = "success",
            "Validation completed: {}", $msg
        );
    };
    (failure, $component:expr, error = $error:expr) => {
        tracing::warn!(
            event_type = "validation",
            component = $component,
            result = "failure",
            error = %$error,
            "Validation failed"
        );
    };
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    #[test]
    fn test_logging_macros_compile() {
        let set_id = Uuid::new_v4();
        let card_id = Uuid::new_v4();
        let error = anyhow::anyhow!("test error");

        log_api_start!("test_operation", set_id = set_id, card_id = card_id);
        log_api_start!("test_operation", set_id = set_id);
        log_api_start!("test_operation");

        log_api_success!("test_operation", set_id = set_id, card_id = card_id, "card updated");
        log_api_success!("test_operation", set_id = set_id, "set updated");
        log_api_success!("test_operation", count = 5, "sets listed");
        log_api_success!("test_operation", "done");

        log_api_warn!("test_operation", set_id = set_id, card_id = card_id, "card missing");
        log_api_warn!("test_operation", set_id = set_id, "set missing");
        log_api_warn!("test_operation", "warning");

        log_api_error!("test_operation", set_id = set_id, error = error, "failed");
        log_api_error!("test_operation", error = error, "failed");

        log_store_operation!(debug, "save", count = 3, duration_ms = 2);
        log_store_operation!(info, "open", "store opened");
        log_store_operation!(error, "save", error = error);

        log_llm_operation!(start, "generate_flashcards", provider = "Gemini", card_count = 5);
        log_llm_operation!(success, "generate_flashcards", provider = "Gemini", card_count = 5);
        log_llm_operation!(error, "generate_flashcards", provider = "Gemini", error = error, retry_count = 0);

        log_system_event!(startup, component = "server", "server starting");
        log_system_event!(config, "configuration loaded");

        log_validation!(success, "config", "config validated");
        log_validation!(failure, "config", error = error);
    }
}
