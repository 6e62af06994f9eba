mod test_duplicate_answer_is_ignored;
mod test_glare_converges;
