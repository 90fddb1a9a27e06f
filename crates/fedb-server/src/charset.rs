//! MySQL collation ids
//!
//! Every collation id a client can announce in its handshake response,
//! sorted by id.

/// A charset/collation pair known by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collation {
    pub id: u8,
    pub charset: &'static str,
    pub name: &'static str,
}

const fn c(id: u8, charset: &'static str, name: &'static str) -> Collation {
    Collation { id, charset, name }
}

pub const COLLATIONS: &[Collation] = &[
    c(1, "big5", "big5_chinese_ci"),
    c(2, "latin2", "latin2_czech_cs"),
    c(3, "dec8", "dec8_swedish_ci"),
    c(4, "cp850", "cp850_general_ci"),
    c(5, "latin1", "latin1_german1_ci"),
    c(6, "hp8", "hp8_english_ci"),
    c(7, "koi8r", "koi8r_general_ci"),
    c(8, "latin1", "latin1_swedish_ci"),
    c(9, "latin2", "latin2_general_ci"),
    c(10, "swe7", "swe7_swedish_ci"),
    c(11, "ascii", "ascii_general_ci"),
    c(12, "ujis", "ujis_japanese_ci"),
    c(13, "sjis", "sjis_japanese_ci"),
    c(14, "cp1251", "cp1251_bulgarian_ci"),
    c(15, "latin1", "latin1_danish_ci"),
    c(16, "hebrew", "hebrew_general_ci"),
    c(18, "tis620", "tis620_thai_ci"),
    c(19, "euckr", "euckr_korean_ci"),
    c(20, "latin7", "latin7_estonian_cs"),
    c(21, "latin2", "latin2_hungarian_ci"),
    c(22, "koi8u", "koi8u_general_ci"),
    c(23, "cp1251", "cp1251_ukrainian_ci"),
    c(24, "gb2312", "gb2312_chinese_ci"),
    c(25, "greek", "greek_general_ci"),
    c(26, "cp1250", "cp1250_general_ci"),
    c(27, "latin2", "latin2_croatian_ci"),
    c(28, "gbk", "gbk_chinese_ci"),
    c(29, "cp1257", "cp1257_lithuanian_ci"),
    c(30, "latin5", "latin5_turkish_ci"),
    c(31, "latin1", "latin1_german2_ci"),
    c(32, "armscii8", "armscii8_general_ci"),
    c(33, "utf8", "utf8_general_ci"),
    c(34, "cp1250", "cp1250_czech_cs"),
    c(35, "ucs2", "ucs2_general_ci"),
    c(36, "cp866", "cp866_general_ci"),
    c(37, "keybcs2", "keybcs2_general_ci"),
    c(38, "macce", "macce_general_ci"),
    c(39, "macroman", "macroman_general_ci"),
    c(40, "cp852", "cp852_general_ci"),
    c(41, "latin7", "latin7_general_ci"),
    c(42, "latin7", "latin7_general_cs"),
    c(43, "macce", "macce_bin"),
    c(44, "cp1250", "cp1250_croatian_ci"),
    c(45, "utf8mb4", "utf8mb4_general_ci"),
    c(46, "utf8mb4", "utf8mb4_bin"),
    c(47, "latin1", "latin1_bin"),
    c(48, "latin1", "latin1_general_ci"),
    c(49, "latin1", "latin1_general_cs"),
    c(50, "cp1251", "cp1251_bin"),
    c(51, "cp1251", "cp1251_general_ci"),
    c(52, "cp1251", "cp1251_general_cs"),
    c(53, "macroman", "macroman_bin"),
    c(54, "utf16", "utf16_general_ci"),
    c(55, "utf16", "utf16_bin"),
    c(56, "utf16le", "utf16le_general_ci"),
    c(57, "cp1256", "cp1256_general_ci"),
    c(58, "cp1257", "cp1257_bin"),
    c(59, "cp1257", "cp1257_general_ci"),
    c(60, "utf32", "utf32_general_ci"),
    c(61, "utf32", "utf32_bin"),
    c(62, "utf16le", "utf16le_bin"),
    c(63, "binary", "binary"),
    c(64, "armscii8", "armscii8_bin"),
    c(65, "ascii", "ascii_bin"),
    c(66, "cp1250", "cp1250_bin"),
    c(67, "cp1256", "cp1256_bin"),
    c(68, "cp866", "cp866_bin"),
    c(69, "dec8", "dec8_bin"),
    c(70, "greek", "greek_bin"),
    c(71, "hebrew", "hebrew_bin"),
    c(72, "hp8", "hp8_bin"),
    c(73, "keybcs2", "keybcs2_bin"),
    c(74, "koi8r", "koi8r_bin"),
    c(75, "koi8u", "koi8u_bin"),
    c(76, "utf8", "utf8_tolower_ci"),
    c(77, "latin2", "latin2_bin"),
    c(78, "latin5", "latin5_bin"),
    c(79, "latin7", "latin7_bin"),
    c(80, "cp850", "cp850_bin"),
    c(81, "cp852", "cp852_bin"),
    c(82, "swe7", "swe7_bin"),
    c(83, "utf8", "utf8_bin"),
    c(84, "big5", "big5_bin"),
    c(85, "euckr", "euckr_bin"),
    c(86, "gb2312", "gb2312_bin"),
    c(87, "gbk", "gbk_bin"),
    c(88, "sjis", "sjis_bin"),
    c(89, "tis620", "tis620_bin"),
    c(90, "ucs2", "ucs2_bin"),
    c(91, "ujis", "ujis_bin"),
    c(92, "geostd8", "geostd8_general_ci"),
    c(93, "geostd8", "geostd8_bin"),
    c(94, "latin1", "latin1_spanish_ci"),
    c(95, "cp932", "cp932_japanese_ci"),
    c(96, "cp932", "cp932_bin"),
    c(97, "eucjpms", "eucjpms_japanese_ci"),
    c(98, "eucjpms", "eucjpms_bin"),
    c(99, "cp1250", "cp1250_polish_ci"),
    c(101, "utf16", "utf16_unicode_ci"),
    c(102, "utf16", "utf16_icelandic_ci"),
    c(103, "utf16", "utf16_latvian_ci"),
    c(104, "utf16", "utf16_romanian_ci"),
    c(105, "utf16", "utf16_slovenian_ci"),
    c(106, "utf16", "utf16_polish_ci"),
    c(107, "utf16", "utf16_estonian_ci"),
    c(108, "utf16", "utf16_spanish_ci"),
    c(109, "utf16", "utf16_swedish_ci"),
    c(110, "utf16", "utf16_turkish_ci"),
    c(111, "utf16", "utf16_czech_ci"),
    c(112, "utf16", "utf16_danish_ci"),
    c(113, "utf16", "utf16_lithuanian_ci"),
    c(114, "utf16", "utf16_slovak_ci"),
    c(115, "utf16", "utf16_spanish2_ci"),
    c(116, "utf16", "utf16_roman_ci"),
    c(117, "utf16", "utf16_persian_ci"),
    c(118, "utf16", "utf16_esperanto_ci"),
    c(119, "utf16", "utf16_hungarian_ci"),
    c(120, "utf16", "utf16_sinhala_ci"),
    c(121, "utf16", "utf16_german2_ci"),
    c(122, "utf16", "utf16_croatian_ci"),
    c(123, "utf16", "utf16_unicode_520_ci"),
    c(124, "utf16", "utf16_vietnamese_ci"),
    c(128, "ucs2", "ucs2_unicode_ci"),
    c(129, "ucs2", "ucs2_icelandic_ci"),
    c(130, "ucs2", "ucs2_latvian_ci"),
    c(131, "ucs2", "ucs2_romanian_ci"),
    c(132, "ucs2", "ucs2_slovenian_ci"),
    c(133, "ucs2", "ucs2_polish_ci"),
    c(134, "ucs2", "ucs2_estonian_ci"),
    c(135, "ucs2", "ucs2_spanish_ci"),
    c(136, "ucs2", "ucs2_swedish_ci"),
    c(137, "ucs2", "ucs2_turkish_ci"),
    c(138, "ucs2", "ucs2_czech_ci"),
    c(139, "ucs2", "ucs2_danish_ci"),
    c(140, "ucs2", "ucs2_lithuanian_ci"),
    c(141, "ucs2", "ucs2_slovak_ci"),
    c(142, "ucs2", "ucs2_spanish2_ci"),
    c(143, "ucs2", "ucs2_roman_ci"),
    c(144, "ucs2", "ucs2_persian_ci"),
    c(145, "ucs2", "ucs2_esperanto_ci"),
    c(146, "ucs2", "ucs2_hungarian_ci"),
    c(147, "ucs2", "ucs2_sinhala_ci"),
    c(148, "ucs2", "ucs2_german2_ci"),
    c(149, "ucs2", "ucs2_croatian_ci"),
    c(150, "ucs2", "ucs2_unicode_520_ci"),
    c(151, "ucs2", "ucs2_vietnamese_ci"),
    c(159, "ucs2", "ucs2_general_mysql500_ci"),
    c(160, "utf32", "utf32_unicode_ci"),
    c(161, "utf32", "utf32_icelandic_ci"),
    c(162, "utf32", "utf32_latvian_ci"),
    c(163, "utf32", "utf32_romanian_ci"),
    c(164, "utf32", "utf32_slovenian_ci"),
    c(165, "utf32", "utf32_polish_ci"),
    c(166, "utf32", "utf32_estonian_ci"),
    c(167, "utf32", "utf32_spanish_ci"),
    c(168, "utf32", "utf32_swedish_ci"),
    c(169, "utf32", "utf32_turkish_ci"),
    c(170, "utf32", "utf32_czech_ci"),
    c(171, "utf32", "utf32_danish_ci"),
    c(172, "utf32", "utf32_lithuanian_ci"),
    c(173, "utf32", "utf32_slovak_ci"),
    c(174, "utf32", "utf32_spanish2_ci"),
    c(175, "utf32", "utf32_roman_ci"),
    c(176, "utf32", "utf32_persian_ci"),
    c(177, "utf32", "utf32_esperanto_ci"),
    c(178, "utf32", "utf32_hungarian_ci"),
    c(179, "utf32", "utf32_sinhala_ci"),
    c(180, "utf32", "utf32_german2_ci"),
    c(181, "utf32", "utf32_croatian_ci"),
    c(182, "utf32", "utf32_unicode_520_ci"),
    c(183, "utf32", "utf32_vietnamese_ci"),
    c(192, "utf8", "utf8_unicode_ci"),
    c(193, "utf8", "utf8_icelandic_ci"),
    c(194, "utf8", "utf8_latvian_ci"),
    c(195, "utf8", "utf8_romanian_ci"),
    c(196, "utf8", "utf8_slovenian_ci"),
    c(197, "utf8", "utf8_polish_ci"),
    c(198, "utf8", "utf8_estonian_ci"),
    c(199, "utf8", "utf8_spanish_ci"),
    c(200, "utf8", "utf8_swedish_ci"),
    c(201, "utf8", "utf8_turkish_ci"),
    c(202, "utf8", "utf8_czech_ci"),
    c(203, "utf8", "utf8_danish_ci"),
    c(204, "utf8", "utf8_lithuanian_ci"),
    c(205, "utf8", "utf8_slovak_ci"),
    c(206, "utf8", "utf8_spanish2_ci"),
    c(207, "utf8", "utf8_roman_ci"),
    c(208, "utf8", "utf8_persian_ci"),
    c(209, "utf8", "utf8_esperanto_ci"),
    c(210, "utf8", "utf8_hungarian_ci"),
    c(211, "utf8", "utf8_sinhala_ci"),
    c(212, "utf8", "utf8_german2_ci"),
    c(213, "utf8", "utf8_croatian_ci"),
    c(214, "utf8", "utf8_unicode_520_ci"),
    c(215, "utf8", "utf8_vietnamese_ci"),
    c(223, "utf8", "utf8_general_mysql500_ci"),
    c(224, "utf8mb4", "utf8mb4_unicode_ci"),
    c(225, "utf8mb4", "utf8mb4_icelandic_ci"),
    c(226, "utf8mb4", "utf8mb4_latvian_ci"),
    c(227, "utf8mb4", "utf8mb4_romanian_ci"),
    c(228, "utf8mb4", "utf8mb4_slovenian_ci"),
    c(229, "utf8mb4", "utf8mb4_polish_ci"),
    c(230, "utf8mb4", "utf8mb4_estonian_ci"),
    c(231, "utf8mb4", "utf8mb4_spanish_ci"),
    c(232, "utf8mb4", "utf8mb4_swedish_ci"),
    c(233, "utf8mb4", "utf8mb4_turkish_ci"),
    c(234, "utf8mb4", "utf8mb4_czech_ci"),
    c(235, "utf8mb4", "utf8mb4_danish_ci"),
    c(236, "utf8mb4", "utf8mb4_lithuanian_ci"),
    c(237, "utf8mb4", "utf8mb4_slovak_ci"),
    c(238, "utf8mb4", "utf8mb4_spanish2_ci"),
    c(239, "utf8mb4", "utf8mb4_roman_ci"),
    c(240, "utf8mb4", "utf8mb4_persian_ci"),
    c(241, "utf8mb4", "utf8mb4_esperanto_ci"),
    c(242, "utf8mb4", "utf8mb4_hungarian_ci"),
    c(243, "utf8mb4", "utf8mb4_sinhala_ci"),
    c(244, "utf8mb4", "utf8mb4_german2_ci"),
    c(245, "utf8mb4", "utf8mb4_croatian_ci"),
    c(246, "utf8mb4", "utf8mb4_unicode_520_ci"),
    c(247, "utf8mb4", "utf8mb4_vietnamese_ci"),
    c(248, "gb18030", "gb18030_chinese_ci"),
    c(249, "gb18030", "gb18030_bin"),
    c(250, "gb18030", "gb18030_unicode_520_ci"),
    c(255, "utf8mb4", "utf8mb4_0900_ai_ci"),
];

/// Look up a collation by the id clients send in the handshake.
pub fn collation_by_id(id: u8) -> Option<Collation> {
    COLLATIONS
        .binary_search_by_key(&id, |c| c.id)
        .ok()
        .map(|i| COLLATIONS[i])
}

/// Look up a collation by name, ignoring case.
pub fn collation_by_name(name: &str) -> Option<Collation> {
    COLLATIONS
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(name))
        .copied()
}
