pub const ANTENNA: &str = r#"
      .
     /|\
    / | \     srpd
   /  |  \    service registration protocol server
  '---+---'
      |
______|______
"#;
