use disasm_test::test::{Parser, Test};

#[test]
fn parse_flags() {
    let src = " +a\t+b  -abc-foo -foo  +bar+foo";
    let mut flags = disasm_test::test::parse_flags(src);
    assert_eq!(flags.next(), Some(("a", true)));
    assert_eq!(flags.next(), Some(("b", true)));
    assert_eq!(flags.next(), Some(("abc-foo", false)));
    assert_eq!(flags.next(), Some(("foo", false)));
    assert_eq!(flags.next(), Some(("bar+foo", true)));
    assert_eq!(flags.next(), None);
}

#[test]
fn parse() -> Result<(), String> {
    let src = r#"// comment
        1000: d503201f      nop
              d65f03c0      ret   // +alias

        2000: 91004020      add x0, x1, #0x10 ; x0 = x1 + 0x10
              0000          (bad)
    "#;

    let mut parser = Parser::new("input", src);
    let mut test = Test::default();

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.line, 2);
    assert_eq!(test.address, 0x1000);
    assert_eq!(test.bytes, &[0x1f, 0x20, 0x03, 0xd5]);
    assert_eq!(test.asm, "nop");
    assert_eq!(test.comment, "");

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.line, 3);
    assert_eq!(test.address, 0x1004);
    assert_eq!(test.asm, "ret");
    assert_eq!(test.comment, "+alias");

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.line, 5);
    assert_eq!(test.address, 0x2000);
    assert_eq!(test.asm, "add x0, x1, #0x10 ; x0 = x1 + 0x10");

    assert!(parser.parse(&mut test)?);
    assert_eq!(test.address, 0x2004);
    assert_eq!(test.bytes, &[0x00, 0x00]);
    assert_eq!(test.asm, "(bad)");

    assert!(!parser.parse(&mut test)?);

    Ok(())
}

#[test]
fn parse_errors() {
    let mut test = Test::default();
    assert!(Parser::new("input", "xyz: 00  nop").parse(&mut test).is_err());
    assert!(Parser::new("input", "1000: 0  nop").parse(&mut test).is_err());
    assert!(Parser::new("input", "1000:   nop").parse(&mut test).is_err());
}

#[test]
fn parse_all() -> Result<(), String> {
    let src = "
        1000: d503201f  nop
        1008: d65f03c0  ret
    ";
    let (start, data) = Parser::parse_all(src)?;
    assert_eq!(start, 0x1000);
    assert_eq!(
        data,
        [0x1f, 0x20, 0x03, 0xd5, 0, 0, 0, 0, 0xc0, 0x03, 0x5f, 0xd6]
    );

    assert!(Parser::parse_all("1000: 00  a\n0ff0: 00  b").is_err());
    Ok(())
}
