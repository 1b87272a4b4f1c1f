mod test_membership;
