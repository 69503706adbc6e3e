pub async fn liveness_handler() -> &'static str {
    "harpoon is listening\n"
}
