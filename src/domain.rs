export![cube, directions, lut, mips, sky];
